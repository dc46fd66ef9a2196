use core::fmt;
use core::ops::RangeInclusive;

use crate::config::HOME_ANGLE;

/// One servo of the arm. Declaration order is the wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Gripper,
    Rotation,
    Link2,
    Link1,
    Base,
}

impl Channel {
    pub const COUNT: usize = 5;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Gripper,
        Channel::Rotation,
        Channel::Link2,
        Channel::Link1,
        Channel::Base,
    ];

    /// Position of this channel inside an angle command.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn min(self) -> u8 {
        match self {
            Channel::Gripper => 60,
            _ => 0,
        }
    }

    pub const fn max(self) -> u8 {
        match self {
            Channel::Gripper => 125,
            _ => 180,
        }
    }

    pub const fn range(self) -> RangeInclusive<u8> {
        self.min()..=self.max()
    }

    /// Microcontroller pin driving this servo.
    pub const fn pin(self) -> u8 {
        match self {
            Channel::Gripper => 10,
            Channel::Rotation => 9,
            Channel::Link2 => 8,
            Channel::Link1 => 7,
            Channel::Base => 6,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Channel::Gripper => "GRIPPER",
            Channel::Rotation => "ROTATION",
            Channel::Link2 => "LINK 2",
            Channel::Link1 => "LINK 1",
            Channel::Base => "BASE",
        }
    }

    /// Pulls `angle` into this channel's range.
    pub fn clamp(self, angle: i32) -> u8 {
        angle.clamp(self.min() as i32, self.max() as i32) as u8
    }

    /// Truncates toward zero, then clamps.
    pub fn clamp_fractional(self, angle: f32) -> u8 {
        // `as` saturates and maps NaN to 0
        self.clamp(angle as i32)
    }
}

/// The five joint angles in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AngleVector([u8; Channel::COUNT]);

impl AngleVector {
    pub const HOME: AngleVector = AngleVector([HOME_ANGLE; Channel::COUNT]);

    /// Builds a vector from raw values, clamping each one to its channel.
    pub fn new(angles: [i32; Channel::COUNT]) -> Self {
        let mut clamped = [0u8; Channel::COUNT];
        for channel in Channel::ALL {
            clamped[channel.index()] = channel.clamp(angles[channel.index()]);
        }
        Self(clamped)
    }

    pub fn from_fractional(angles: [f32; Channel::COUNT]) -> Self {
        let mut clamped = [0u8; Channel::COUNT];
        for channel in Channel::ALL {
            clamped[channel.index()] = channel.clamp_fractional(angles[channel.index()]);
        }
        Self(clamped)
    }

    /// Table constructor for routine data; values are not clamped here, so
    /// tables are checked with [`AngleVector::is_within_bounds`].
    pub const fn from_raw(angles: [u8; Channel::COUNT]) -> Self {
        Self(angles)
    }

    pub fn get(&self, channel: Channel) -> u8 {
        self.0[channel.index()]
    }

    /// Stores `angle` clamped to the channel's range and returns the stored value.
    pub fn set(&mut self, channel: Channel, angle: i32) -> u8 {
        let value = channel.clamp(angle);
        self.0[channel.index()] = value;
        value
    }

    pub fn as_array(&self) -> &[u8; Channel::COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, u8)> + '_ {
        Channel::ALL.into_iter().map(|channel| (channel, self.get(channel)))
    }

    pub fn is_within_bounds(&self) -> bool {
        self.iter().all(|(channel, angle)| channel.range().contains(&angle))
    }

    /// Same vector with every value pulled into range.
    pub fn clamped(&self) -> Self {
        Self::new(self.0.map(i32::from))
    }
}

impl Default for AngleVector {
    fn default() -> Self {
        Self::HOME
    }
}

/// Wire rendering: `a1,a2,a3,a4,a5`.
impl fmt::Display for AngleVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a1, a2, a3, a4, a5] = self.0;
        write!(f, "{a1},{a2},{a3},{a4},{a5}")
    }
}
