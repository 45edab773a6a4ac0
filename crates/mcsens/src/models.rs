//! Built-in demo forward processes.

use std::time::Duration;

use mcsens_core::{ForwardError, ForwardProcess, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoModel {
    /// Process plant: temperature, pressure, humidity -> efficiency, cost, quality
    #[default]
    Plant,
    /// Synthetic benchmark: input1..3 -> output1..3
    Benchmark,
}

impl DemoModel {
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            DemoModel::Plant => &["temperature", "pressure", "humidity"],
            DemoModel::Benchmark => &["input1", "input2", "input3"],
        }
    }

    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            DemoModel::Plant => &["efficiency", "cost", "quality"],
            DemoModel::Benchmark => &["output1", "output2", "output3"],
        }
    }

    /// Evaluate the model, returning the input columns followed by the outputs.
    pub fn evaluate(&self, input: &Table) -> Result<Table, ForwardError> {
        let outputs: [(&str, Vec<f64>); 3] = match self {
            DemoModel::Plant => {
                let t = input.require("temperature")?;
                let p = input.require("pressure")?;
                let h = input.require("humidity")?;
                [
                    (
                        "efficiency",
                        (0..t.len())
                            .map(|i| t[i] * 0.5 + p[i] * 0.3 - h[i] * 0.2)
                            .collect(),
                    ),
                    (
                        "cost",
                        (0..t.len()).map(|i| t[i].powi(2) * 10.0 + p[i] * 50.0).collect(),
                    ),
                    (
                        "quality",
                        (0..t.len()).map(|i| (t[i] / 100.0).exp() * p[i]).collect(),
                    ),
                ]
            }
            DemoModel::Benchmark => {
                let x1 = input.require("input1")?;
                let x2 = input.require("input2")?;
                [
                    (
                        "output1",
                        x1.iter().zip(x2).map(|(a, b)| a * 2.0 + b * 3.0).collect(),
                    ),
                    (
                        "output2",
                        x1.iter().zip(x2).map(|(a, b)| a.powi(2) + b).collect(),
                    ),
                    (
                        "output3",
                        x1.iter().zip(x2).map(|(a, b)| a.sin() + b.cos()).collect(),
                    ),
                ]
            }
        };

        let mut result = input.clone();
        for (name, values) in outputs {
            result = result.with_column(name, values)?;
        }
        Ok(result)
    }
}

/// A demo model with an optional artificial per-call cost
#[derive(Debug, Clone)]
pub struct DemoProcess {
    model: DemoModel,
    delay: Duration,
}

impl DemoProcess {
    pub fn new(model: DemoModel) -> Self {
        Self {
            model,
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` on every call, standing in for an expensive simulation.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ForwardProcess for DemoProcess {
    fn forward(&mut self, input: &Table) -> Result<Table, ForwardError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.model.evaluate(input)
    }
}
