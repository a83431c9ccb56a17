use crate::gateway::MediaPayload;

/// Press-and-hold voice note capture.
///
/// Start and stop are edge-triggered: a second press while recording and a
/// release while idle are ignored. Releasing with nothing captured yields no
/// payload, so no submission is attempted.
#[derive(Debug, Default)]
pub struct AudioCapture {
    recording: Option<String>,
    buffer: Vec<u8>,
}

impl AudioCapture {
    /// Begin recording. Returns `false` when already recording.
    pub fn press(&mut self, mime_type: impl Into<String>) -> bool {
        if self.recording.is_some() {
            return false;
        }
        self.recording = Some(mime_type.into());
        self.buffer.clear();
        true
    }

    /// Append captured bytes; dropped when not recording.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if self.recording.is_none() {
            return false;
        }
        self.buffer.extend_from_slice(bytes);
        true
    }

    pub fn release(&mut self) -> Option<MediaPayload> {
        let mime_type = self.recording.take()?;
        let bytes = std::mem::take(&mut self.buffer);
        if bytes.is_empty() {
            return None;
        }
        Some(MediaPayload::new(bytes, mime_type))
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn captured_bytes(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_capture_release_yields_one_payload() {
        let mut capture = AudioCapture::default();
        assert!(capture.press("audio/x-m4a"));
        capture.append(&[1, 2]);
        capture.append(&[3]);

        let payload = capture.release().unwrap();
        assert_eq!(payload.bytes, vec![1, 2, 3]);
        assert_eq!(payload.mime_type, "audio/x-m4a");
        assert!(!capture.is_recording());
    }

    #[test]
    fn release_without_audio_is_a_no_op() {
        let mut capture = AudioCapture::default();
        assert!(capture.release().is_none());

        capture.press("audio/wav");
        assert!(capture.release().is_none());
        assert!(!capture.is_recording());
    }

    #[test]
    fn repeated_press_does_not_restart_recording() {
        let mut capture = AudioCapture::default();
        capture.press("audio/wav");
        capture.append(&[9]);
        assert!(!capture.press("audio/wav"));
        assert_eq!(capture.captured_bytes(), 1);
    }

    #[test]
    fn bytes_outside_a_recording_are_dropped() {
        let mut capture = AudioCapture::default();
        assert!(!capture.append(&[1, 2, 3]));
        capture.press("audio/wav");
        assert!(capture.release().is_none());
    }
}
