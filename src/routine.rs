//! Routines as data, and the sequencer that plays them.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::{IDLE_GLYPH, ROUTINE_PAUSE_MS};
use crate::connection::CommandSink;
use crate::joint::AngleVector;
use crate::motion::MotionScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Display(&'static str),
    /// Interpolated move of all joints.
    MoveTo(AngleVector),
    /// Blocking pause in milliseconds.
    Pause(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routine {
    pub name: &'static str,
    pub steps: &'static [Step],
}

impl Routine {
    pub const fn new(name: &'static str, steps: &'static [Step]) -> Self {
        Self { name, steps }
    }

    /// Case-insensitive; "Action X" also answers to "X".
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name)
            || self
                .name
                .strip_prefix("Action ")
                .is_some_and(|short| short.eq_ignore_ascii_case(name))
    }

    pub fn last_display(&self) -> Option<&'static str> {
        self.steps.iter().rev().find_map(|step| match step {
            Step::Display(text) => Some(*text),
            _ => None,
        })
    }

    pub fn final_pose(&self) -> Option<AngleVector> {
        self.steps.iter().rev().find_map(|step| match step {
            Step::MoveTo(angles) => Some(*angles),
            _ => None,
        })
    }

    /// True when the table already leaves the arm home with the idle glyph up.
    pub fn ends_idle(&self) -> bool {
        self.last_display() == Some(IDLE_GLYPH) && self.final_pose() == Some(AngleVector::HOME)
    }
}

pub fn find<'r>(routines: &'r [Routine], name: &str) -> Option<&'r Routine> {
    routines.iter().find(|routine| routine.matches(name))
}

const fn to(angles: [u8; 5]) -> Step {
    Step::MoveTo(AngleVector::from_raw(angles))
}

const PAUSE: Step = Step::Pause(ROUTINE_PAUSE_MS);
const IDLE: Step = Step::Display(IDLE_GLYPH);
const GO_HOME: Step = Step::MoveTo(AngleVector::HOME);
/// Gripper open, everything else centred.
const CLEAR: Step = to([60, 90, 90, 90, 90]);

pub const HOME: Routine = Routine {
    name: "Home",
    steps: &[IDLE, GO_HOME],
};

/// Pick and place between two points on the right, twice.
pub const ACTION_A: Routine = Routine {
    name: "Action A",
    steps: &[
        Step::Display("A"),
        to([90, 150, 120, 90, 120]),
        PAUSE,
        to([115, 150, 120, 90, 120]),
        PAUSE,
        to([115, 150, 120, 90, 75]),
        PAUSE,
        to([60, 150, 120, 90, 75]),
        PAUSE,
        to([60, 150, 120, 90, 120]),
        PAUSE,
        to([115, 150, 120, 90, 120]),
        PAUSE,
        to([115, 150, 120, 90, 75]),
        PAUSE,
        to([60, 150, 120, 90, 75]),
        PAUSE,
        CLEAR,
        IDLE,
        GO_HOME,
    ],
};

/// Left to right transfer, three times.
pub const ACTION_B: Routine = Routine {
    name: "Action B",
    steps: &[
        Step::Display("B"),
        to([90, 90, 152, 90, 130]),
        PAUSE,
        to([115, 90, 152, 90, 130]),
        PAUSE,
        to([115, 90, 152, 90, 50]),
        PAUSE,
        to([60, 90, 152, 90, 50]),
        PAUSE,
        to([60, 90, 152, 90, 130]),
        PAUSE,
        to([115, 90, 152, 90, 130]),
        PAUSE,
        to([115, 90, 152, 90, 50]),
        PAUSE,
        to([60, 90, 152, 90, 50]),
        PAUSE,
        to([60, 90, 152, 90, 130]),
        PAUSE,
        to([115, 90, 152, 90, 130]),
        PAUSE,
        to([115, 90, 152, 90, 50]),
        PAUSE,
        to([60, 90, 152, 90, 50]),
        PAUSE,
        CLEAR,
        IDLE,
        GO_HOME,
    ],
};

const C_START: Step = to([90, 134, 151, 90, 125]);
const C_GRAB: Step = to([115, 134, 151, 90, 125]);
const C_CARRY: Step = to([115, 134, 115, 90, 77]);
const C_RELEASE: Step = to([90, 134, 115, 90, 77]);
const C_NOD_UP: Step = to([90, 120, 140, 90, 90]);
const C_NOD_DOWN: Step = to([90, 120, 155, 90, 90]);

/// Four continuous carry cycles without pauses, then a nod.
pub const ACTION_C: Routine = Routine {
    name: "Action C",
    steps: &[
        Step::Display("C"),
        C_START,
        C_GRAB,
        C_CARRY,
        C_CARRY,
        C_RELEASE,
        C_START,
        C_GRAB,
        C_CARRY,
        C_CARRY,
        C_RELEASE,
        C_START,
        C_GRAB,
        C_CARRY,
        C_CARRY,
        C_RELEASE,
        C_START,
        C_GRAB,
        C_CARRY,
        C_CARRY,
        C_RELEASE,
        C_NOD_UP,
        C_NOD_DOWN,
        C_NOD_UP,
        C_NOD_DOWN,
        C_NOD_UP,
        C_NOD_DOWN,
        PAUSE,
        IDLE,
        GO_HOME,
    ],
};

pub const BUILTIN_ROUTINES: &[Routine] = &[HOME, ACTION_A, ACTION_B, ACTION_C];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    /// The sequencer had to add the home/idle tail itself.
    pub epilogue: bool,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    step_index: usize,
    display_settle_ms: u32,
}

impl Sequencer {
    pub fn new(display_settle_ms: u32) -> Self {
        Self {
            step_index: 0,
            display_settle_ms,
        }
    }

    /// Index of the step being executed; 0 when idle.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Plays every step of `routine`, then makes sure the arm is home with
    /// the idle glyph shown.
    pub fn run<S: CommandSink, D: DelayNs>(
        &mut self,
        routine: &Routine,
        motion: &mut MotionScheduler,
        sink: &mut S,
        delay: &mut D,
    ) -> RunSummary {
        info!("Routine {} started, {} steps", routine.name, routine.steps.len());
        self.step_index = 0;

        let mut last_display = None;
        for step in routine.steps {
            if let Step::Display(text) = step {
                last_display = Some(*text);
            }
            self.execute(step, motion, sink, delay);
            self.step_index += 1;
        }

        let epilogue = last_display != Some(IDLE_GLYPH) || motion.angles() != AngleVector::HOME;
        if epilogue {
            warn!("Routine {} did not end idle, returning home", routine.name);
            self.execute(&IDLE, motion, sink, delay);
            self.execute(&GO_HOME, motion, sink, delay);
        }

        let steps = self.step_index;
        self.step_index = 0;
        info!("Routine {} finished", routine.name);
        RunSummary { steps, epilogue }
    }

    fn execute<S: CommandSink, D: DelayNs>(
        &self,
        step: &Step,
        motion: &mut MotionScheduler,
        sink: &mut S,
        delay: &mut D,
    ) {
        debug!("Step {}: {:?}", self.step_index, step);
        match step {
            Step::Display(text) => match sink.send_display(text) {
                Ok(()) => delay.delay_ms(self.display_settle_ms),
                Err(e) => debug!("Display {:?} not sent: {}", text, e),
            },
            Step::MoveTo(angles) => {
                motion.move_all(angles, sink, delay);
            }
            Step::Pause(ms) => delay.delay_ms(*ms),
        }
    }
}
