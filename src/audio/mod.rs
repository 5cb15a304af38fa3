//! Audio collaborators
//!
//! Synthetic devices are always available; real microphone and speaker
//! support through cpal sits behind the `cpal-devices` feature.

pub mod sink;
pub mod tone;

#[cfg(feature = "cpal-devices")]
pub mod capture;
#[cfg(feature = "cpal-devices")]
pub mod device;
#[cfg(feature = "cpal-devices")]
pub mod playback;

pub use sink::NullOutput;
pub use tone::ToneInput;

#[cfg(feature = "cpal-devices")]
pub use capture::CpalInput;
#[cfg(feature = "cpal-devices")]
pub use device::{list_devices, AudioDeviceInfo};
#[cfg(feature = "cpal-devices")]
pub use playback::CpalOutput;

/// Decode s16le bytes, carrying a dangling odd byte over to the next call.
///
/// The audio wire has no chunk boundaries, so a socket read can end in the
/// middle of a sample.
#[derive(Debug, Default)]
pub struct SampleAssembler {
    carry: Option<u8>,
}

impl SampleAssembler {
    pub fn push(&mut self, bytes: &[u8], out: &mut Vec<i16>) {
        let mut rest = bytes;
        if let Some(lo) = self.carry.take() {
            match rest.split_first() {
                Some((&hi, tail)) => {
                    out.push(i16::from_le_bytes([lo, hi]));
                    rest = tail;
                }
                None => {
                    self.carry = Some(lo);
                    return;
                }
            }
        }

        let mut pairs = rest.chunks_exact(2);
        out.extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
        self.carry = pairs.remainder().first().copied();
    }
}
