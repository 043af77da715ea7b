pub use crate::audio::{NoiseBufferSet, Voice};

#[derive(Debug)]
pub enum AudioCommand {
    // A fully built voice. The engine owns it from here on; nothing on the
    // control side keeps a handle, so there is no cancel or query command.
    Connect(Voice),
}

// What the scheduler needs from the audio side: the hardware clock, the
// session's noise buffers, and somewhere to put voices. Voices connect into
// the master gain stage; the graph owns everything downstream of it.
pub trait OutputGraph {
    /// Current time on the hardware audio clock, in seconds.
    fn current_time(&self) -> f64;

    fn noise(&self) -> &NoiseBufferSet;

    fn connect(&mut self, voice: Voice);
}
