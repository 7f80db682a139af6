// Messaging module
// Lock-free hand-off between the MIDI callback thread and the polling loop

pub mod channels;
