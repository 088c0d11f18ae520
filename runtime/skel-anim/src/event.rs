//! Delivery of state time events to script listeners

/// An entity that can receive animation events
///
/// Each crossed event is delivered once to every script component.
pub trait EventTarget {
    fn num_script_components(&self) -> usize;

    fn call_script_func(&mut self, component: usize, func: &str);
}

/// Target without scripts. Events are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTarget;

impl EventTarget for NoopTarget {
    fn num_script_components(&self) -> usize {
        0
    }

    fn call_script_func(&mut self, _component: usize, _func: &str) {}
}

/// Records every call, in order. Handy for tools and tests.
#[derive(Debug, Clone)]
pub struct RecordingTarget {
    components: usize,
    calls: Vec<(usize, String)>,
}

impl RecordingTarget {
    pub fn new(components: usize) -> Self {
        Self {
            components,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[(usize, String)] {
        &self.calls
    }

    /// Names called on component 0
    pub fn names(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|(component, _)| *component == 0)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl EventTarget for RecordingTarget {
    fn num_script_components(&self) -> usize {
        self.components
    }

    fn call_script_func(&mut self, component: usize, func: &str) {
        self.calls.push((component, func.to_string()));
    }
}
