use super::{OutputLine, SignalLamp};

/// Two exclusive output lines driving one signal head. Starts on red.
pub struct DualLineLamp<L> {
    red: L,
    green: L,
}

impl<L: OutputLine> DualLineLamp<L> {
    pub fn new(mut red: L, mut green: L) -> Self {
        green.write(false);
        red.write(true);
        Self { red, green }
    }
}

impl<L: OutputLine> SignalLamp for DualLineLamp<L> {
    fn set_green(&mut self) {
        // Red goes dark first so both lines are never lit together.
        self.red.write(false);
        self.green.write(true);
    }

    fn set_red(&mut self) {
        self.green.write(false);
        self.red.write(true);
    }

    fn is_green(&self) -> bool {
        self.green.is_high()
    }
}
