//! Joint-by-joint interpolation.
//!
//! Every single-degree step sends the whole angle vector, and `move_all`
//! finishes one joint before it starts the next. Joints never move together.

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use crate::connection::CommandSink;
use crate::joint::{AngleVector, Channel};

#[derive(Debug, Clone)]
pub struct MotionScheduler {
    angles: AngleVector,
    step_delay_ms: u32,
}

impl MotionScheduler {
    /// Starts at the home pose.
    pub fn new(step_delay_ms: u32) -> Self {
        Self::with_angles(AngleVector::HOME, step_delay_ms)
    }

    pub fn with_angles(angles: AngleVector, step_delay_ms: u32) -> Self {
        Self {
            angles: angles.clamped(),
            step_delay_ms,
        }
    }

    pub fn angles(&self) -> AngleVector {
        self.angles
    }

    pub fn step_delay_ms(&self) -> u32 {
        self.step_delay_ms
    }

    /// Sets one channel without interpolating or sending.
    pub fn set(&mut self, channel: Channel, angle: i32) -> u8 {
        self.angles.set(channel, angle)
    }

    /// Walks `channel` one degree at a time to `target`, sending the full
    /// vector and waiting after each step. Returns how many vectors were
    /// emitted.
    pub fn smooth_move<S: CommandSink, D: DelayNs>(
        &mut self,
        channel: Channel,
        target: i32,
        sink: &mut S,
        delay: &mut D,
    ) -> usize {
        let target = i32::from(channel.clamp(target));
        let mut current = i32::from(self.angles.get(channel));

        if current == target {
            self.emit(sink);
            return 1;
        }

        // The start pose is not re-sent; a move of n degrees is n writes.
        let step = if target > current { 1 } else { -1 };
        let mut emitted = 0;
        while current != target {
            current += step;
            self.angles.set(channel, current);
            self.emit(sink);
            delay.delay_ms(self.step_delay_ms);
            emitted += 1;
        }
        emitted
    }

    /// Interpolates every channel in wire order, one after the other.
    pub fn move_all<S: CommandSink, D: DelayNs>(
        &mut self,
        targets: &AngleVector,
        sink: &mut S,
        delay: &mut D,
    ) -> usize {
        debug!("Moving {} -> {}", self.angles, targets);
        let mut emitted = 0;
        for channel in Channel::ALL {
            emitted += self.smooth_move(channel, i32::from(targets.get(channel)), sink, delay);
        }
        emitted
    }

    fn emit<S: CommandSink>(&self, sink: &mut S) {
        if let Err(e) = sink.send_angles(&self.angles) {
            trace!("Angle vector {} not sent: {}", self.angles, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ArmError;
    use crate::fake::FakeClock;

    /// Records every vector it is handed; optionally refuses them all.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<AngleVector>,
        refuse: bool,
    }

    impl CommandSink for Recorder {
        fn send_angles(&mut self, angles: &AngleVector) -> Result<(), ArmError> {
            if self.refuse {
                return Err(ArmError::WriteDropped);
            }
            self.sent.push(*angles);
            Ok(())
        }

        fn send_display(&mut self, _text: &str) -> Result<(), ArmError> {
            Ok(())
        }
    }

    fn vector() -> impl Strategy<Value = AngleVector> {
        prop::array::uniform5(-30i32..220).prop_map(AngleVector::new)
    }

    #[test]
    fn equal_target_still_sends_once() {
        let mut motion = MotionScheduler::new(20);
        let mut sink = Recorder::default();
        let mut clock = FakeClock::default();

        let emitted = motion.smooth_move(Channel::Base, 90, &mut sink, &mut clock);

        assert_eq!(emitted, 1);
        assert_eq!(sink.sent, vec![AngleVector::HOME]);
        assert_eq!(clock.total_ms(), 0, "No step, no wait");
    }

    #[test]
    fn every_step_sends_the_whole_vector() {
        let mut motion = MotionScheduler::new(20);
        let mut sink = Recorder::default();
        let mut clock = FakeClock::default();

        motion.smooth_move(Channel::Link2, 93, &mut sink, &mut clock);

        let lines: Vec<String> = sink.sent.iter().map(|v| v.to_string()).collect();
        assert_eq!(lines, vec!["90,90,91,90,90", "90,90,92,90,90", "90,90,93,90,90"]);
        assert_eq!(clock.waits_ms(), &[20, 20, 20]);
    }

    #[test]
    fn moving_down_steps_negative() {
        let mut motion = MotionScheduler::new(20);
        let mut sink = Recorder::default();
        motion.smooth_move(Channel::Gripper, 88, &mut sink, &mut FakeClock::default());

        let grippers: Vec<u8> = sink.sent.iter().map(|v| v.get(Channel::Gripper)).collect();
        assert_eq!(grippers, vec![89, 88]);
    }

    #[test]
    fn move_all_finishes_each_joint_before_the_next() {
        let mut motion = MotionScheduler::new(20);
        let mut sink = Recorder::default();
        let target = AngleVector::new([92, 90, 90, 90, 88]);

        let emitted = motion.move_all(&target, &mut sink, &mut FakeClock::default());

        let lines: Vec<String> = sink.sent.iter().map(|v| v.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "91,90,90,90,90",
                "92,90,90,90,90",
                "92,90,90,90,90",
                "92,90,90,90,90",
                "92,90,90,90,90",
                "92,90,90,90,89",
                "92,90,90,90,88",
            ]
        );
        assert_eq!(emitted, 7);
    }

    #[test]
    fn refused_writes_still_move_internally() {
        let mut motion = MotionScheduler::new(20);
        let mut sink = Recorder {
            refuse: true,
            ..Recorder::default()
        };
        motion.smooth_move(Channel::Gripper, 125, &mut sink, &mut FakeClock::default());
        assert!(sink.sent.is_empty());
        assert_eq!(motion.angles().get(Channel::Gripper), 125);
    }

    #[test]
    fn out_of_range_targets_are_clamped() {
        let mut motion = MotionScheduler::new(0);
        let mut sink = Recorder::default();
        motion.smooth_move(Channel::Gripper, 300, &mut sink, &mut FakeClock::default());
        assert_eq!(motion.angles().get(Channel::Gripper), 125);
        assert_eq!(sink.sent.len(), 35);
    }

    proptest! {
        #[test]
        fn move_all_reaches_target_within_bounds(start in vector(), target in vector()) {
            let mut motion = MotionScheduler::with_angles(start, 0);
            let mut sink = Recorder::default();
            motion.move_all(&target, &mut sink, &mut FakeClock::default());

            prop_assert_eq!(motion.angles(), target);
            prop_assert!(sink.sent.iter().all(|v| v.is_within_bounds()));
        }

        #[test]
        fn round_trip_restores_start(a in vector(), b in vector()) {
            let mut motion = MotionScheduler::with_angles(a, 0);
            let mut sink = Recorder::default();
            let mut clock = FakeClock::default();
            motion.move_all(&b, &mut sink, &mut clock);
            motion.move_all(&a, &mut sink, &mut clock);
            prop_assert_eq!(motion.angles(), a);
        }

        #[test]
        fn write_count_matches_distance(start in vector(), target in vector()) {
            let mut motion = MotionScheduler::with_angles(start, 0);
            let mut sink = Recorder::default();
            let emitted = motion.move_all(&target, &mut sink, &mut FakeClock::default());

            let expected: usize = Channel::ALL
                .iter()
                .map(|&c| (start.get(c) as i32 - target.get(c) as i32).unsigned_abs().max(1) as usize)
                .sum();
            prop_assert_eq!(emitted, expected);
            prop_assert_eq!(sink.sent.len(), expected);
        }
    }
}
