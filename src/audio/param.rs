// Automation on the audio clock: a start value plus time-ordered events,
// looked up per sample by whichever voice owns the param.

/// Smallest value an exponential decay is allowed to reach. Exponential
/// curves can't pass through zero, so envelopes stop here instead.
pub const DECAY_FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// Exponential ramps need a strictly positive target.
    #[error("exponential ramp target must be positive, got {0}")]
    NonPositiveTarget(f32),

    /// The value the ramp starts from must be strictly positive too.
    #[error("exponential ramp cannot start from {0}")]
    NonPositiveStart(f32),

    #[error("automation event at {time}s precedes the previous event at {last}s")]
    OutOfOrder { time: f64, last: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ParamEvent {
    Set { value: f32, time: f64 },
    ExpRamp { value: f32, time: f64 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::Set { time, .. } | ParamEvent::ExpRamp { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            ParamEvent::Set { value, .. } | ParamEvent::ExpRamp { value, .. } => value,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AudioParam {
    initial: f32,
    events: Vec<ParamEvent>,
}

impl AudioParam {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::with_capacity(4),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<&mut Self, ParamError> {
        self.check_order(time)?;
        self.events.push(ParamEvent::Set { value, time });
        Ok(self)
    }

    /// Exponentially approach `value`, arriving exactly at `time`. The curve
    /// starts at the previous event.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f32,
        time: f64,
    ) -> Result<&mut Self, ParamError> {
        if !(value > 0.0) {
            return Err(ParamError::NonPositiveTarget(value));
        }
        let from = self.last_value();
        if !(from > 0.0) {
            return Err(ParamError::NonPositiveStart(from));
        }
        self.check_order(time)?;
        self.events.push(ParamEvent::ExpRamp { value, time });
        Ok(self)
    }

    pub fn end_time(&self) -> f64 {
        self.events.last().map(ParamEvent::time).unwrap_or(0.0)
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let mut value = self.initial;
        let mut from = 0.0;
        for event in &self.events {
            match *event {
                ParamEvent::Set { value: v, time } => {
                    if t < time {
                        return value;
                    }
                    value = v;
                    from = time;
                }
                ParamEvent::ExpRamp { value: v, time } => {
                    if t >= time {
                        value = v;
                        from = time;
                        continue;
                    }
                    if t <= from || time <= from {
                        return value;
                    }
                    let frac = ((t - from) / (time - from)) as f32;
                    return value * (v / value).powf(frac);
                }
            }
        }
        value
    }

    // late voices get their whole timeline pushed back
    pub(crate) fn shift(&mut self, dt: f64) {
        for event in &mut self.events {
            match event {
                ParamEvent::Set { time, .. } | ParamEvent::ExpRamp { time, .. } => *time += dt,
            }
        }
    }

    fn last_value(&self) -> f32 {
        self.events.last().map(ParamEvent::value).unwrap_or(self.initial)
    }

    fn check_order(&self, time: f64) -> Result<(), ParamError> {
        let last = self.end_time();
        if !self.events.is_empty() && time < last {
            return Err(ParamError::OutOfOrder { time, last });
        }
        Ok(())
    }
}
