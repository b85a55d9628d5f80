use crate::ffi::jg_inputstate_t;
use crate::manager::InputInfo;

/// Input buffers for one port, lent to the core through `jg_inputstate_t`.
pub struct InputPort {
    defs: Vec<String>,
    numaxes: usize,
    axis: Vec<i16>,
    button: Vec<u8>,
    coord: [i32; 3],
    rel: [i32; 3],
    state: Box<jg_inputstate_t>,
}

impl InputPort {
    pub fn new(info: &InputInfo) -> Self {
        let numaxes = info.numaxes.max(0) as usize;
        let numbuttons = info.numbuttons.max(0) as usize;
        let mut port = InputPort {
            defs: info.defs.clone(),
            numaxes,
            axis: vec![0; numaxes.max(1)],
            button: vec![0; numbuttons.max(1)],
            coord: [0; 3],
            rel: [0; 3],
            state: Box::new(jg_inputstate_t {
                axis: std::ptr::null_mut(),
                button: std::ptr::null_mut(),
                coord: std::ptr::null_mut(),
                rel: std::ptr::null_mut(),
            }),
        };
        port.state.axis = port.axis.as_mut_ptr();
        port.state.button = port.button.as_mut_ptr();
        port.state.coord = port.coord.as_mut_ptr();
        port.state.rel = port.rel.as_mut_ptr();
        port
    }

    /// Pointer to hand to `jg_set_inputstate`. Valid while `self` lives.
    pub fn state_ptr(&mut self) -> *mut jg_inputstate_t {
        &mut *self.state
    }

    /// Presses or releases the button whose definition is `name`.
    /// Returns false if the port has no such button.
    pub fn set_button(&mut self, name: &str, pressed: bool) -> bool {
        let Some(pos) = self.defs.iter().position(|d| d == name) else {
            return false;
        };
        let Some(index) = pos.checked_sub(self.numaxes) else {
            return false;
        };
        match self.button.get_mut(index) {
            Some(b) => {
                *b = u8::from(pressed);
                true
            }
            None => false,
        }
    }

    pub fn buttons(&self) -> &[u8] {
        &self.button
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> InputInfo {
        InputInfo {
            kind: 0,
            index: 0,
            name: "nespad1".into(),
            fname: "NES Controller".into(),
            defs: ["Up", "Down", "Left", "Right", "Select", "Start", "A", "B"]
                .map(String::from)
                .to_vec(),
            numaxes: 0,
            numbuttons: 8,
        }
    }

    #[test]
    fn buttons_follow_definition_order() {
        let mut port = InputPort::new(&controller());
        assert!(port.set_button("Start", true));
        assert!(port.set_button("A", true));
        assert!(!port.set_button("Turbo", true));
        assert_eq!(port.buttons(), [0u8, 0, 0, 0, 0, 1, 1, 0]);

        port.set_button("A", false);
        assert_eq!(port.buttons()[6], 0);
    }

    #[test]
    fn axes_are_not_buttons() {
        let mut info = controller();
        info.defs.insert(0, "Dial".into());
        info.numaxes = 1;
        let mut port = InputPort::new(&info);
        assert!(!port.set_button("Dial", true));
        assert!(port.set_button("Up", true));
        assert_eq!(port.buttons()[0], 1);
    }

    #[test]
    fn state_points_at_owned_buffers() {
        let mut port = InputPort::new(&controller());
        port.set_button("B", true);
        let state = port.state_ptr();
        let pressed = unsafe { *(*state).button.add(7) };
        assert_eq!(pressed, 1);
    }
}
