//! Operating mode and the teleop toggles

use std::sync::atomic::{AtomicU8, Ordering};
use parking_lot::Mutex;

/// High-level operating state; every component defers to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode{
    Teleop = 0,
    AutoDig = 1,
    AutoOffload = 2,
    /// Representable and rendered, but nothing in this core enters or leaves it
    EmergencyStop = 3,
}

impl Mode{
    fn from_u8(val: u8) -> Self{
        match val{
            1 => Mode::AutoDig,
            2 => Mode::AutoOffload,
            3 => Mode::EmergencyStop,
            _ => Mode::Teleop,
        }
    }

    pub fn is_autonomous(self) -> bool{
        matches!(self, Mode::AutoDig | Mode::AutoOffload)
    }
}

/// Lock-free cell holding the current mode
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell{
    pub fn new(mode: Mode) -> Self{
        Self(AtomicU8::new(mode as u8))
    }

    pub fn get(&self) -> Mode{
        Mode::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: Mode){
        self.0.store(mode as u8, Ordering::Release);
    }

    /// Move `from -> to` only if the cell still holds `from`
    pub fn transition(&self, from: Mode, to: Mode) -> bool{
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for ModeCell{
    fn default() -> Self{
        Self::new(Mode::Teleop)
    }
}

/// Operator-latched switches, only mutable in Teleop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleFlags{
    pub digger_on: bool,
    pub offloader_on: bool,
    pub digger_extended: bool,
    /// true selects the front camera, false the rear one
    pub camera_select: bool,
}

/// Mode plus toggles, shared by the input handler, the actuator timer and
/// the autonomous worker
#[derive(Debug, Default)]
pub struct ControlState{
    mode: ModeCell,
    toggles: Mutex<ToggleFlags>,
}

impl ControlState{
    pub fn new() -> Self{
        Self::default()
    }

    pub fn mode(&self) -> Mode{
        self.mode.get()
    }

    pub fn set_mode(&self, mode: Mode){
        self.mode.set(mode);
    }

    pub fn transition(&self, from: Mode, to: Mode) -> bool{
        self.mode.transition(from, to)
    }

    pub fn toggles(&self) -> ToggleFlags{
        *self.toggles.lock()
    }

    /// Mode and toggles read together for the periodic publisher
    pub fn snapshot(&self) -> (Mode, ToggleFlags){
        let toggles = self.toggles.lock();
        (self.mode.get(), *toggles)
    }

    /// Apply `f` to the toggles if the robot is in Teleop
    ///
    /// Returns the updated flags, or `None` when the mode froze them.
    pub fn update_toggles<F>(&self, f: F) -> Option<ToggleFlags>
    where
        F: FnOnce(&mut ToggleFlags),
    {
        let mut toggles = self.toggles.lock();
        if self.mode.get() != Mode::Teleop{
            return None;
        }
        f(&mut toggles);
        Some(*toggles)
    }

    /// Leave autonomy: return to Teleop with digger and offloader off
    pub fn enter_teleop_cleared(&self){
        let mut toggles = self.toggles.lock();
        toggles.digger_on = false;
        toggles.offloader_on = false;
        toggles.digger_extended = false;
        self.mode.set(Mode::Teleop);
    }
}

#[cfg(test)]
mod tests{
    use super::*;

    #[test]
    fn test_starts_in_teleop(){
        let state = ControlState::new();
        assert_eq!(state.mode(), Mode::Teleop);
        assert_eq!(state.toggles(), ToggleFlags::default());
    }

    #[test]
    fn test_transition_is_conditional(){
        let cell = ModeCell::new(Mode::AutoDig);
        assert!(!cell.transition(Mode::AutoOffload, Mode::Teleop));
        assert_eq!(cell.get(), Mode::AutoDig);
        assert!(cell.transition(Mode::AutoDig, Mode::Teleop));
        assert_eq!(cell.get(), Mode::Teleop);
    }

    #[test]
    fn test_every_mode_roundtrips(){
        let cell = ModeCell::default();
        for mode in [Mode::Teleop, Mode::AutoDig, Mode::AutoOffload, Mode::EmergencyStop]{
            cell.set(mode);
            assert_eq!(cell.get(), mode);
        }
    }

    #[test]
    fn test_toggles_frozen_outside_teleop(){
        let state = ControlState::new();
        assert!(state.update_toggles(|t| t.digger_on = true).is_some());

        state.set_mode(Mode::AutoDig);
        assert!(state.update_toggles(|t| t.digger_on = false).is_none());
        assert!(state.toggles().digger_on);
    }

    #[test]
    fn test_enter_teleop_clears_motors(){
        let state = ControlState::new();
        state.update_toggles(|t|{
            t.digger_on = true;
            t.offloader_on = true;
            t.camera_select = true;
        });
        state.set_mode(Mode::AutoOffload);
        state.enter_teleop_cleared();

        let toggles = state.toggles();
        assert_eq!(state.mode(), Mode::Teleop);
        assert!(!toggles.digger_on);
        assert!(!toggles.offloader_on);
        assert!(toggles.camera_select);
    }
}
