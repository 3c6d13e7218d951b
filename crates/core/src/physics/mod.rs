//! Fire behavior physics: FBP spread, crown fire, slope and spotting

pub mod albini_spotting;
pub mod crown_fire;
pub mod fire_behavior;
pub mod terrain_physics;

pub use albini_spotting::{
    calculate_lofting_height, calculate_maximum_spotting_distance, launch_embers,
    resolve_landing, EmberLanding, EmberParticle, SpottingParams,
};
pub use crown_fire::{calculate_crown_fire_behavior, CrownFireBehavior, CrownFireType};
pub use fire_behavior::{
    buildup_effect, calculate_fire_behavior, BehaviorParams, FireBehaviorResult, Terrain, Wind,
};
pub use terrain_physics::calculate_slope_factor;
