/// Default simulation step in seconds (one frame at 60 Hz).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Default number of velocity solver iterations per step.
pub const DEFAULT_VELOCITY_ITERATIONS: u32 = 8;

/// Default number of position (stabilization) iterations per step.
pub const DEFAULT_POSITION_ITERATIONS: u32 = 1;

/// Scene-space units per physics-space meter.
///
/// Scene coordinates are pixels; the engine works best with bodies sized
/// around 0.1..10 meters, so a 50px sprite becomes a 0.5m body.
pub const DEFAULT_PIXELS_PER_METER: f32 = 100.0;

/// Gravity in meters per second squared. Scene space is Y-down, so positive Y falls.
pub const DEFAULT_GRAVITY_MPS2: [f32; 2] = [0.0, 9.81];

pub const DEFAULT_DENSITY: f32 = 1.0;
pub const DEFAULT_RESTITUTION: f32 = 0.3;
pub const DEFAULT_FRICTION: f32 = 0.0;

/// Group 0 means "no group": category/mask decide.
pub const DEFAULT_GROUP_INDEX: i16 = 0;
pub const DEFAULT_CATEGORY_BITS: u16 = 0x0001;
pub const DEFAULT_MASK_BITS: u16 = 0xFFFF;

/// Points of a freshly constructed triangle collider (scene units).
pub const DEFAULT_TRIANGLE_POINTS: [[f32; 2]; 3] = [[0.0, -1.0], [1.0, 0.0], [0.0, 1.0]];
