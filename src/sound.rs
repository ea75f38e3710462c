use beep::beep;
use std::error::Error;
use tracing::debug;

/// The buzzer. The environment keeps it sounding while the sound timer is
/// non-zero.
pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
    fn is_beeping(&self) -> bool;

    /// start or stop to match the sound timer, touching the device only on
    /// a change
    fn update(&mut self, sound_timer: u8) -> Result<(), Box<dyn Error>> {
        match (sound_timer > 0, self.is_beeping()) {
            (true, false) => self.beep(),
            (false, true) => self.stop(),
            _ => Ok(()),
        }
    }
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// square wave through the PC speaker, via the `beep` crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        debug!(pitch = SIMPLEBEEP_PITCH, "buzzer on");
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        beep(0)?;
        debug!("buzzer off");
        self.is_beeping = false;
        Ok(())
    }

    fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}

/// no sound, but remembers whether it would be sounding
#[derive(Default)]
pub struct Mute {
    is_beeping: bool,
    pub beeps: usize,
}

impl Mute {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        self.is_beeping = true;
        self.beeps += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.is_beeping = false;
        Ok(())
    }

    fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}
