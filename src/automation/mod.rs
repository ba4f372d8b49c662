//! Transition automation
//!
//! Recipes turn a technique into control points; the scheduler places them on
//! both sides of every boundary and adds loop tails.

mod recipe;
mod scheduler;

pub use recipe::{
    recipe_for, AutomationRecipe, ControlPoint, CurveKind, Direction, FilterMode, Param,
    BASS_KILL_DB, DEFAULT_Q, EXP_FLOOR, OPEN_CUTOFF_HZ,
};
pub use scheduler::{MixSchedule, ScheduledClip, ScheduledTrack, TransitionScheduler};
