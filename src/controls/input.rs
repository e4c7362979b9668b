// Input conditioning for controller axes and buttons

/// Zero `value` when it is inside `band`, pass it through otherwise
pub fn apply_deadband(value: f64, band: f64) -> f64 {
    if value.abs() < band { 0.0 } else { value }
}

/// Rising-edge detector: reports a press once, on the poll it happens
#[derive(Debug, Clone, Copy, Default)]
pub struct Latch {
    previous: bool,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the raw button state, returns true only on a released -> pressed edge
    pub fn update(&mut self, pressed: bool) -> bool {
        let rising = pressed && !self.previous;
        self.previous = pressed;
        rising
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadband() {
        assert_eq!(apply_deadband(0.05, 0.075), 0.0);
        assert_eq!(apply_deadband(-0.07, 0.075), 0.0);
        assert_eq!(apply_deadband(0.075, 0.075), 0.075);
        assert_eq!(apply_deadband(-0.5, 0.075), -0.5);
        assert_eq!(apply_deadband(1.0, 0.0), 1.0);
    }

    #[test]
    fn test_latch_reports_edge_once() {
        let mut latch = Latch::new();
        assert!(!latch.update(false));
        assert!(latch.update(true));
        assert!(!latch.update(true));
        assert!(!latch.update(true));
        assert!(!latch.update(false));
        assert!(latch.update(true));
    }
}
