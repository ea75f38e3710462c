/// What to do with a program that does not fit between 0x200 and the end of
/// memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// fail the load
    #[default]
    Reject,
    /// keep what fits, drop the rest
    Truncate,
}

/// Behavior switches for instructions whose semantics differ between
/// historical interpreters. Defaults follow the COSMAC VIP, except that
/// sprites wrap on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE shift VY into VX; otherwise VX is shifted in place
    pub shift_uses_vy: bool,
    /// FX55/FX65 leave I pointing past the last register transferred
    pub load_store_increments_index: bool,
    /// BNNN adds VX (X being the high nibble of NNN) rather than V0
    pub jump_offset_uses_vx: bool,
    /// 8XY1/8XY2/8XY3 zero VF
    pub logic_resets_flag: bool,
    /// sprite pixels past the right or bottom edge are dropped instead of wrapped
    pub clip_sprites: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            shift_uses_vy: true,
            load_store_increments_index: true,
            jump_offset_uses_vx: false,
            logic_resets_flag: false,
            clip_sprites: false,
        }
    }
}

/// Run-time configuration for a machine and its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// instructions per second
    pub cpu_hz: u32,
    /// timer decrement and display refresh rate
    pub timer_hz: u32,
    pub load_policy: LoadPolicy,
    pub quirks: Quirks,
    /// seed for CXNN; entropy when unset
    pub seed: Option<u64>,
    /// ticks a key stays latched after the last press event
    pub key_hold_frames: u32,
    /// stop after this many instructions
    pub max_cycles: Option<u64>,
    pub mute: bool,
}

pub const DEFAULT_CPU_HZ: u32 = 700;
pub const DEFAULT_TIMER_HZ: u32 = 60;
pub const DEFAULT_KEY_HOLD_FRAMES: u32 = 6;

impl Default for Config {
    fn default() -> Self {
        Config {
            cpu_hz: DEFAULT_CPU_HZ,
            timer_hz: DEFAULT_TIMER_HZ,
            load_policy: LoadPolicy::default(),
            quirks: Quirks::default(),
            seed: None,
            key_hold_frames: DEFAULT_KEY_HOLD_FRAMES,
            max_cycles: None,
            mute: false,
        }
    }
}
