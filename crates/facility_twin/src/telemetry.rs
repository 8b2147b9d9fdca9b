use serde::{Deserialize, Serialize};

/// Seconds between target recomputations. Displayed values keep moving
/// every frame regardless of this interval.
pub const TARGET_TICK_SECS: f32 = 1.5;

/// Fraction of the remaining gap to the target closed per smoothing step.
pub const SMOOTHING_FACTOR: f32 = 0.12;

/// Minimum seconds between readout snapshots handed to the UI (~4 Hz).
pub const READOUT_MIN_INTERVAL_SECS: f32 = 0.25;

/// The smoothed scalar signals the facility twin exposes. Order here is the
/// display order in the panel.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MetricKind {
    OilRate,
    GasRate,
    WaterCut,
    TankLevel,
    SeparatorPressure,
    FlareRate,
    RecoveredVaporRate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::OilRate,
        MetricKind::GasRate,
        MetricKind::WaterCut,
        MetricKind::TankLevel,
        MetricKind::SeparatorPressure,
        MetricKind::FlareRate,
        MetricKind::RecoveredVaporRate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::OilRate => "Oil rate",
            MetricKind::GasRate => "Gas rate",
            MetricKind::WaterCut => "Water cut",
            MetricKind::TankLevel => "Tank level",
            MetricKind::SeparatorPressure => "Separator pressure",
            MetricKind::FlareRate => "Flare rate",
            MetricKind::RecoveredVaporRate => "Recovered vapor",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::OilRate => "bbl/d",
            MetricKind::GasRate => "Mscf/d",
            MetricKind::WaterCut => "%",
            MetricKind::TankLevel => "%",
            MetricKind::SeparatorPressure => "psi",
            MetricKind::FlareRate => "Mscf/d",
            MetricKind::RecoveredVaporRate => "Mscf/d",
        }
    }

    fn oscillator(&self) -> Oscillator {
        match self {
            MetricKind::OilRate => Oscillator {
                baseline: 420.0,
                waves: [(60.0, 0.11, 0.0), (22.0, 0.31, 1.7)],
                min: 0.0,
                max: 900.0,
            },
            MetricKind::GasRate => Oscillator {
                baseline: 1_150.0,
                waves: [(170.0, 0.09, 0.6), (55.0, 0.27, 2.9)],
                min: 0.0,
                max: 2_400.0,
            },
            MetricKind::WaterCut => Oscillator {
                baseline: 38.0,
                waves: [(5.0, 0.07, 1.2), (1.8, 0.23, 0.4)],
                min: 0.0,
                max: 100.0,
            },
            MetricKind::TankLevel => Oscillator {
                baseline: 62.0,
                waves: [(9.0, 0.05, 2.1), (2.5, 0.17, 0.9)],
                min: 0.0,
                max: 100.0,
            },
            MetricKind::SeparatorPressure => Oscillator {
                baseline: 145.0,
                waves: [(12.0, 0.13, 0.3), (4.0, 0.37, 2.2)],
                min: 0.0,
                max: 300.0,
            },
            MetricKind::FlareRate => Oscillator {
                baseline: 360.0,
                waves: [(120.0, 0.08, 1.5), (40.0, 0.21, 0.2)],
                min: 0.0,
                max: 800.0,
            },
            MetricKind::RecoveredVaporRate => Oscillator {
                baseline: 95.0,
                waves: [(28.0, 0.1, 2.6), (9.0, 0.29, 1.1)],
                min: 0.0,
                max: 260.0,
            },
        }
    }

    /// Change threshold that fires a readout pulse: fractional for open-ended
    /// rates, absolute for bounded-range metrics (percent, pressure).
    pub fn pulse_threshold(&self) -> PulseThreshold {
        match self {
            MetricKind::OilRate
            | MetricKind::GasRate
            | MetricKind::FlareRate
            | MetricKind::RecoveredVaporRate => PulseThreshold::Fractional(0.035),
            MetricKind::WaterCut | MetricKind::TankLevel => PulseThreshold::Absolute(1.2),
            MetricKind::SeparatorPressure => PulseThreshold::Absolute(3.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PulseThreshold {
    Fractional(f32),
    Absolute(f32),
}

/// Bounded sum of two sinusoids around a fixed baseline.
#[derive(Clone, Copy, Debug)]
struct Oscillator {
    baseline: f32,
    /// (amplitude, frequency in Hz, phase offset in radians)
    waves: [(f32, f32, f32); 2],
    min: f32,
    max: f32,
}

impl Oscillator {
    fn target_at(&self, elapsed_secs: f32) -> f32 {
        let mut value = self.baseline;
        for (amplitude, frequency, phase) in self.waves {
            value += amplitude
                * (elapsed_secs * frequency * std::f32::consts::TAU + phase).sin();
        }
        value.clamp(self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug)]
struct MetricSignal {
    target: f32,
    displayed: f32,
}

/// Synthetic telemetry generator: discrete target ticks, continuous
/// exponential approach of the displayed values.
#[derive(Clone, Debug)]
pub struct TelemetrySim {
    elapsed_secs: f32,
    since_tick_secs: f32,
    signals: [MetricSignal; MetricKind::ALL.len()],
}

impl Default for TelemetrySim {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySim {
    pub fn new() -> Self {
        let signals = MetricKind::ALL.map(|kind| {
            let baseline = kind.oscillator().baseline;
            MetricSignal {
                target: baseline,
                displayed: baseline,
            }
        });
        Self {
            elapsed_secs: 0.0,
            since_tick_secs: 0.0,
            signals,
        }
    }

    /// Advance time by one frame. Targets step only on tick boundaries;
    /// displayed values close a fixed fraction of the gap every call, so
    /// they stay continuous across target jumps.
    pub fn advance(&mut self, dt_secs: f32) {
        if !dt_secs.is_finite() || dt_secs <= 0.0 {
            return;
        }
        self.elapsed_secs += dt_secs;
        self.since_tick_secs += dt_secs;

        while self.since_tick_secs >= TARGET_TICK_SECS {
            self.since_tick_secs -= TARGET_TICK_SECS;
            self.retarget();
        }

        for signal in &mut self.signals {
            signal.displayed += (signal.target - signal.displayed) * SMOOTHING_FACTOR;
        }
    }

    fn retarget(&mut self) {
        for (index, kind) in MetricKind::ALL.iter().enumerate() {
            self.signals[index].target = kind.oscillator().target_at(self.elapsed_secs);
        }
    }

    /// Pin a metric's target, overriding the oscillator until the next tick.
    /// Used by scripted scenarios and tests.
    pub fn force_target(&mut self, kind: MetricKind, value: f32) {
        self.signals[Self::index_of(kind)].target = value;
    }

    /// Apply one smoothing step without moving time or ticking targets.
    pub fn smooth_step(&mut self) {
        for signal in &mut self.signals {
            signal.displayed += (signal.target - signal.displayed) * SMOOTHING_FACTOR;
        }
    }

    pub fn displayed(&self, kind: MetricKind) -> f32 {
        self.signals[Self::index_of(kind)].displayed
    }

    pub fn target(&self, kind: MetricKind) -> f32 {
        self.signals[Self::index_of(kind)].target
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_secs
    }

    fn index_of(kind: MetricKind) -> usize {
        MetricKind::ALL
            .iter()
            .position(|candidate| *candidate == kind)
            .unwrap_or(0)
    }
}

/// Downstream consumers read displayed values through snapshots refreshed
/// at a bounded rate, decoupled from the frame rate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadoutSnapshot {
    pub taken_at_secs: f32,
    pub values: Vec<(MetricKind, f32)>,
}

impl ReadoutSnapshot {
    pub fn from_sim(sim: &TelemetrySim) -> Self {
        Self {
            taken_at_secs: sim.elapsed_secs(),
            values: MetricKind::ALL
                .iter()
                .map(|kind| (*kind, sim.displayed(*kind)))
                .collect(),
        }
    }

    pub fn value(&self, kind: MetricKind) -> Option<f32> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, value)| *value)
    }
}

/// Rate limiter for readout snapshots.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadoutThrottle {
    last_emit_secs: Option<f32>,
}

impl ReadoutThrottle {
    pub fn due(&mut self, now_secs: f32) -> bool {
        match self.last_emit_secs {
            Some(last) if now_secs - last < READOUT_MIN_INTERVAL_SECS => false,
            _ => {
                self.last_emit_secs = Some(now_secs);
                true
            }
        }
    }
}

/// Whether the change between two observed values crosses the metric's
/// pulse threshold.
pub fn pulse_exceeded(kind: MetricKind, previous: f32, current: f32) -> bool {
    let delta = (current - previous).abs();
    match kind.pulse_threshold() {
        PulseThreshold::Absolute(threshold) => delta > threshold,
        PulseThreshold::Fractional(threshold) => {
            let reference = previous.abs().max(1e-3);
            delta / reference > threshold
        }
    }
}
