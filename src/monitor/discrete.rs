use vigil_parser::{Trace, Variables};

use super::{Input, Interface, Monitor, MonitorError, Robustness, TimeSemantics};
use crate::loader::SignalData;
use crate::schema::SignalSchema;

/// Evaluates samples that share one time column, aligned by index.
#[derive(Default)]
pub struct DiscreteMonitor {
    interface: Interface,
}

impl DiscreteMonitor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Check that every input is sampled at exactly the reference times.
fn aligned(inputs: &[Input<'_>]) -> Result<(), MonitorError> {
    let Some((reference, others)) = inputs.split_first() else {
        return Err(MonitorError::NoSignals);
    };

    if let Some(pair) = reference.samples.windows(2).find(|pair| pair[1].0 <= pair[0].0) {
        return Err(MonitorError::NonMonotonic {
            signal: reference.name.to_string(),
            time: pair[1].0,
        });
    }

    let same_times = |input: &Input<'_>| {
        input.samples.len() == reference.samples.len()
            && input.samples.iter().zip(reference.samples).all(|(a, b)| a.0 == b.0)
    };

    match others.iter().find(|input| !same_times(*input)) {
        Some(input) => Err(MonitorError::Misaligned {
            signal: input.name.to_string(),
            reference: reference.name.to_string(),
        }),
        None => Ok(()),
    }
}

impl Monitor for DiscreteMonitor {
    fn semantics(&self) -> TimeSemantics {
        TimeSemantics::Discrete
    }

    fn declare(&mut self, schema: &SignalSchema) {
        self.interface.declare(schema);
    }

    fn load_formula(&mut self, text: &str) -> Result<(), MonitorError> {
        self.interface.load(text)
    }

    fn evaluate(&self, data: &SignalData) -> Result<Robustness, MonitorError> {
        let inputs = self.interface.inputs(data)?;
        aligned(&inputs)?;

        let mut trace = Trace::new();

        for (index, &(time, _)) in inputs[0].samples.iter().enumerate() {
            let state: Variables = inputs
                .iter()
                .map(|input| (input.name.to_string(), input.samples[index].1))
                .collect();

            trace
                .try_insert(time, state)
                .map_err(MonitorError::invalid_time(inputs[0].name))?;
        }

        self.interface.evaluate(trace)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::DiscreteMonitor;
    use crate::loader::SignalData;
    use crate::monitor::{Monitor, MonitorError};
    use crate::schema::SignalSchema;

    fn monitor(formula: &str) -> DiscreteMonitor {
        let mut monitor = DiscreteMonitor::new();
        monitor.declare(&SignalSchema::discrete());
        monitor.load_formula(formula).unwrap();
        monitor
    }

    #[test]
    fn bench_property() {
        let monitor = monitor("out = always[0,5](speed <= 100 and acc >= -20 and acc <= 20 and pos >= 0 and pos <= 600)");
        let data = SignalData::from([
            ("speed".to_string(), vec![(0.0, 90.0), (1.0, 95.0), (2.0, 99.0)]),
            ("acc".to_string(), vec![(0.0, 1.0), (1.0, 5.0), (2.0, 4.0)]),
            ("pos".to_string(), vec![(0.0, 10.0), (1.0, 20.0), (2.0, 30.0)]),
        ]);
        let robustness = monitor.evaluate(&data).unwrap();

        assert_eq!(robustness.len(), 3);
        assert_relative_eq!(robustness[0].1, 1.0);
        assert_relative_eq!(robustness[2].1, 1.0);
    }

    #[test]
    fn rejects_misaligned_signals() {
        let monitor = monitor("out = speed <= acc");
        let data = SignalData::from([
            ("speed".to_string(), vec![(0.0, 90.0), (1.0, 95.0)]),
            ("acc".to_string(), vec![(0.0, 1.0), (1.5, 5.0)]),
        ]);

        assert!(matches!(monitor.evaluate(&data), Err(MonitorError::Misaligned { .. })));
    }

    #[test]
    fn rejects_repeated_times() {
        let monitor = monitor("out = speed <= 100");
        let data = SignalData::from([("speed".to_string(), vec![(0.0, 90.0), (0.0, 95.0)])]);

        assert!(matches!(monitor.evaluate(&data), Err(MonitorError::NonMonotonic { .. })));
    }
}
