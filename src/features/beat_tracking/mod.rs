//! Beat tracking
//!
//! - Dynamic-programming beat tracker over the onset envelope
//! - Beat grid helpers: downbeats and grid stability

pub mod dp;
pub mod grid;

pub use dp::track_beats;

/// Tempo driving the beat tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TempoInput {
    /// One tempo for the whole signal (BPM)
    Static(f32),
    /// One tempo per envelope frame (BPM)
    Curve(Vec<f32>),
}

impl TempoInput {
    /// Tempo at frame `i`
    pub fn bpm_at(&self, i: usize) -> f32 {
        match self {
            TempoInput::Static(bpm) => *bpm,
            TempoInput::Curve(curve) => curve.get(i).or(curve.last()).copied().unwrap_or(0.0),
        }
    }

    /// Average tempo
    pub fn mean_bpm(&self) -> f32 {
        match self {
            TempoInput::Static(bpm) => *bpm,
            TempoInput::Curve(curve) if curve.is_empty() => 0.0,
            TempoInput::Curve(curve) => curve.iter().sum::<f32>() / curve.len() as f32,
        }
    }

    /// Every tempo value is finite and positive
    pub fn is_valid(&self) -> bool {
        match self {
            TempoInput::Static(bpm) => bpm.is_finite() && *bpm > 0.0,
            TempoInput::Curve(curve) => {
                !curve.is_empty() && curve.iter().all(|b| b.is_finite() && *b > 0.0)
            }
        }
    }
}

/// Tracked beats
#[derive(Debug, Clone, PartialEq)]
pub struct BeatSequence {
    /// Beat frame indices, strictly increasing
    pub frames: Vec<usize>,
    /// Tempo used for tracking in BPM (0 when no beats could be tracked)
    pub tempo_bpm: f32,
}

impl BeatSequence {
    /// No beats
    pub fn empty() -> Self {
        Self {
            frames: vec![],
            tempo_bpm: 0.0,
        }
    }

    /// Beat times in seconds (`frame * hop / sr`)
    pub fn times(&self, hop_length: usize, sample_rate: u32) -> Vec<f32> {
        self.frames
            .iter()
            .map(|&f| (f * hop_length) as f32 / sample_rate as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_times_from_frames() {
        let beats = BeatSequence {
            frames: vec![0, 43, 86],
            tempo_bpm: 120.0,
        };
        let times = beats.times(512, 44100);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 0.49923).abs() < 1e-4);
    }

    #[test]
    fn test_tempo_input_curve_helpers() {
        let curve = TempoInput::Curve(vec![100.0, 120.0]);
        assert_eq!(curve.bpm_at(1), 120.0);
        assert_eq!(curve.bpm_at(10), 120.0);
        assert_eq!(curve.mean_bpm(), 110.0);
        assert!(curve.is_valid());
        assert!(!TempoInput::Curve(vec![120.0, -1.0]).is_valid());
        assert!(!TempoInput::Static(f32::NAN).is_valid());
    }
}
