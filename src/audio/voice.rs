use super::node::{Layer, to_frame};
use crate::shared::Instrument;

// A fire-and-forget sound: a handful of layers with their own start/stop
// times. Once handed to the output nobody holds on to it; the engine drops it
// after its last layer stops.
#[derive(Clone, Debug)]
pub struct Voice {
    pub instrument: Instrument,
    pub start: f64,
    pub stop: f64,
    pub layers: Vec<Layer>,
}

impl Voice {
    pub fn new(instrument: Instrument, start: f64) -> Self {
        Self {
            instrument,
            start,
            stop: start,
            layers: Vec::with_capacity(4),
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.start = self.start.min(layer.start);
        self.stop = self.stop.max(layer.stop);
        self.layers.push(layer);
        self
    }

    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }

    pub fn start_frame(&self, sample_rate: f32) -> u64 {
        to_frame(self.start, sample_rate)
    }

    pub fn is_finished(&self, frame: u64, sample_rate: f32) -> bool {
        frame >= to_frame(self.stop, sample_rate)
    }

    pub fn render(&mut self, frame: u64, sample_rate: f32) -> f32 {
        self.layers
            .iter_mut()
            .map(|layer| layer.render(frame, sample_rate))
            .sum()
    }

    // Late arrivals get pushed back as a whole so they still play intact.
    pub(crate) fn delay_to(&mut self, start: f64) {
        let dt = start - self.start;
        if dt <= 0.0 {
            return;
        }
        self.start += dt;
        self.stop += dt;
        for layer in &mut self.layers {
            layer.shift(dt);
        }
    }
}
