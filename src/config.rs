//! Configuration parameters for audio analysis
//!
//! Every pipeline stage has its own configuration struct with documented
//! defaults. [`AnalysisConfig`] aggregates them and is threaded through
//! [`crate::analyze`] unchanged.

use crate::error::AnalysisError;
use crate::features::spectral::window::WindowType;
use crate::features::structure::recurrence::RecurrenceMode;
use serde::{Deserialize, Serialize};

/// STFT parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StftConfig {
    /// Frame length in samples (default: 2048)
    /// Non power-of-two lengths are zero-padded internally for the FFT.
    pub frame_length: usize,

    /// Hop length in samples (default: 512)
    pub hop_length: usize,

    /// Analysis window (default: Hann)
    pub window: WindowType,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            window: WindowType::Hann,
        }
    }
}

/// Common-tempo prior used as a tie-breaker between tempo candidates
///
/// This is a heuristic bias toward plausible dance-music tempos, not a hard
/// constraint. Replace `centers`, widen `width_bpm`, or set `enabled = false`
/// to remove the bias entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoPrior {
    /// Apply the prior (default: true)
    pub enabled: bool,

    /// Tempo centers in BPM (default: 120, 128, 140, 174, 100, 85, 90, 110, 160)
    pub centers: Vec<f32>,

    /// Half-width of the triangular bump around each center in BPM (default: 5.0)
    pub width_bpm: f32,

    /// Maximum relative boost at a center (default: 0.15)
    pub boost: f32,
}

impl Default for TempoPrior {
    fn default() -> Self {
        Self {
            enabled: true,
            centers: vec![120.0, 128.0, 140.0, 174.0, 100.0, 85.0, 90.0, 110.0, 160.0],
            width_bpm: 5.0,
            boost: 0.15,
        }
    }
}

/// Octave-error correction thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OctaveCorrection {
    /// Apply octave correction (default: true)
    pub enabled: bool,

    /// Below this tempo, test the doubled tempo (default: 90.0)
    pub double_below_bpm: f32,

    /// Doubled tempo must reach this fraction of the best strength (default: 0.7)
    pub double_strength_ratio: f32,

    /// Above this tempo, halve (default: 160.0)
    pub halve_above_bpm: f32,
}

impl Default for OctaveCorrection {
    fn default() -> Self {
        Self {
            enabled: true,
            double_below_bpm: 90.0,
            double_strength_ratio: 0.7,
            halve_above_bpm: 160.0,
        }
    }
}

/// Tempo estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    /// Minimum BPM to consider (default: 60.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 200.0)
    pub max_bpm: f32,

    /// Tempo reported when the envelope carries no periodicity (default: 120.0)
    pub default_bpm: f32,

    /// Minimum autocorrelation peak prominence relative to the global maximum (default: 0.1)
    pub min_prominence: f32,

    /// Common-tempo prior
    pub prior: TempoPrior,

    /// Octave-error correction
    pub octave: OctaveCorrection,

    /// Track a per-frame tempo curve instead of a single static tempo (default: false)
    pub dynamic: bool,

    /// Window length for the local tempo curve in seconds (default: 8.0)
    pub local_window_seconds: f32,

    /// Maximum relative deviation of the local tempo from the global one (default: 0.1)
    pub max_local_deviation: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 200.0,
            default_bpm: 120.0,
            min_prominence: 0.1,
            prior: TempoPrior::default(),
            octave: OctaveCorrection::default(),
            dynamic: false,
            local_window_seconds: 8.0,
            max_local_deviation: 0.1,
        }
    }
}

/// Dynamic-programming beat tracker parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatTrackerConfig {
    /// Penalty weight for deviating from the expected beat period (default: 100.0)
    pub tightness: f32,

    /// Drop weak leading/trailing beats (default: true)
    pub trim: bool,

    /// Shortest predecessor distance in beat periods (default: 0.5)
    pub min_lookback_beats: f32,

    /// Longest predecessor distance in beat periods (default: 2.5)
    pub max_lookback_beats: f32,

    /// Beats per bar for downbeats and fallback loop length (default: 4)
    pub beats_per_bar: usize,
}

impl Default for BeatTrackerConfig {
    fn default() -> Self {
        Self {
            tightness: 100.0,
            trim: true,
            min_lookback_beats: 0.5,
            max_lookback_beats: 2.5,
            beats_per_bar: 4,
        }
    }
}

/// Chroma extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaConfig {
    /// Tuning reference for A4 in Hz (default: 440.0)
    pub tuning_hz: f32,

    /// Lowest frequency folded into chroma in Hz (default: 55.0)
    pub fmin_hz: f32,

    /// Highest frequency folded into chroma in Hz (default: 5000.0)
    pub fmax_hz: f32,

    /// Spread bin energy to neighbouring semitones (default: true)
    pub soft_mapping: bool,

    /// Soft mapping standard deviation in semitones (default: 0.5)
    pub soft_mapping_sigma: f32,

    /// Moving-average smoothing window in frames, 0 or 1 disables (default: 1)
    pub smoothing_window: usize,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            tuning_hz: 440.0,
            fmin_hz: 55.0,
            fmax_hz: 5000.0,
            soft_mapping: true,
            soft_mapping_sigma: 0.5,
            smoothing_window: 1,
        }
    }
}

/// Recurrence-based structure analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Chroma feature parameters
    pub chroma: ChromaConfig,

    /// Number of stacked copies in the time-delay embedding, 1 disables (default: 10)
    pub embedding_steps: usize,

    /// Delay between stacked copies in frames (default: 3)
    pub embedding_delay: usize,

    /// Recurrence weighting (default: Affinity)
    pub mode: RecurrenceMode,

    /// Diagonal exclusion width: links with |i - j| < width are dropped (default: 3)
    pub width: usize,

    /// Nearest neighbours per frame, `None` = 2 * ceil(sqrt(n - 2 * width + 1)) (default: None)
    pub k: Option<usize>,

    /// Keep only mutual nearest-neighbour links (default: true)
    pub symmetric: bool,

    /// Upper bound on feature frames entering the matrix; longer inputs are decimated (default: 2048)
    pub max_frames: usize,

    /// Shortest loop length in seconds (default: 0.5)
    pub min_loop_seconds: f32,

    /// Longest loop length in seconds (default: 8.0)
    pub max_loop_seconds: f32,

    /// Lag-energy peak threshold relative to the maximum (default: 0.1)
    pub peak_threshold: f32,

    /// Number of candidates kept (default: 10)
    pub top_k: usize,

    /// A start frame is accepted once its repetition strength reaches this
    /// fraction of the best one; the earliest such frame wins (default: 0.8)
    pub start_tolerance: f32,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            chroma: ChromaConfig::default(),
            embedding_steps: 10,
            embedding_delay: 3,
            mode: RecurrenceMode::Affinity,
            width: 3,
            k: None,
            symmetric: true,
            max_frames: 2048,
            min_loop_seconds: 0.5,
            max_loop_seconds: 8.0,
            peak_threshold: 0.1,
            top_k: 10,
            start_tolerance: 0.8,
        }
    }
}

/// Sample-accurate loop refinement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Zero-crossing search radius around each boundary in samples (default: 512)
    pub zero_crossing_radius: usize,

    /// Half-width of the RMS window used to rate a crossing in samples (default: 64)
    pub energy_window: usize,

    /// Loop lengths within this many samples of the structural estimate are
    /// searched for the best waveform match (default: 512)
    pub length_search_radius: usize,

    /// Weight of the structural confidence against the waveform correlation (default: 0.4)
    pub structural_weight: f32,

    /// Fraction of a loop length that must follow the loop to test repetition (default: 0.8)
    pub min_repeat_fraction: f32,

    /// Frame size for the internal-consistency fallback in samples (default: 1024)
    pub consistency_frame: usize,

    /// Onset proximity for boundary alignment in seconds (default: 0.05)
    pub onset_tolerance_seconds: f32,

    /// Onsets used for boundary alignment must exceed median + k·MAD of the
    /// onset envelope (default: 1.5)
    pub onset_threshold_k: f32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            zero_crossing_radius: 512,
            energy_window: 64,
            length_search_radius: 512,
            structural_weight: 0.4,
            min_repeat_fraction: 0.8,
            consistency_frame: 1024,
            onset_tolerance_seconds: 0.05,
            onset_threshold_k: 1.5,
        }
    }
}

/// Default loop used when no candidate is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Minimum refined confidence for a candidate to be chosen (default: 0.5)
    pub acceptance_threshold: f32,

    /// Fallback loop length in bars, halved until it fits (default: 4)
    pub loop_bars: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
            loop_bars: 4,
        }
    }
}

/// Analysis configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// STFT parameters
    pub stft: StftConfig,

    /// Tempo estimation
    pub tempo: TempoConfig,

    /// Beat tracking
    pub beat: BeatTrackerConfig,

    /// Structure analysis
    pub structure: StructureConfig,

    /// Loop refinement
    pub refine: RefineConfig,

    /// Fallback policy
    pub fallback: FallbackConfig,

    /// Run frame-parallel stages on the rayon pool when the `parallel`
    /// feature is enabled (default: true). Results are identical either way.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stft: StftConfig::default(),
            tempo: TempoConfig::default(),
            beat: BeatTrackerConfig::default(),
            structure: StructureConfig::default(),
            refine: RefineConfig::default(),
            fallback: FallbackConfig::default(),
            parallel: default_parallel(),
        }
    }
}

impl AnalysisConfig {
    /// Check every parameter against its valid range
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        fn invalid(msg: String) -> Result<(), AnalysisError> {
            Err(AnalysisError::InvalidInput(msg))
        }

        let stft = &self.stft;
        if stft.frame_length < 16 {
            return invalid(format!("frame_length must be >= 16, got {}", stft.frame_length));
        }
        if stft.hop_length == 0 {
            return invalid("hop_length must be > 0".to_string());
        }

        let tempo = &self.tempo;
        if !(tempo.min_bpm > 0.0 && tempo.min_bpm < tempo.max_bpm && tempo.max_bpm.is_finite()) {
            return invalid(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                tempo.min_bpm, tempo.max_bpm
            ));
        }
        if !(tempo.min_bpm..=tempo.max_bpm).contains(&tempo.default_bpm) {
            return invalid(format!(
                "default_bpm {:.1} outside [{:.1}, {:.1}]",
                tempo.default_bpm, tempo.min_bpm, tempo.max_bpm
            ));
        }
        if !(0.0..=1.0).contains(&tempo.min_prominence) {
            return invalid(format!("min_prominence must be in [0, 1], got {}", tempo.min_prominence));
        }
        if tempo.prior.width_bpm <= 0.0 || tempo.prior.boost < 0.0 {
            return invalid("tempo prior needs width_bpm > 0 and boost >= 0".to_string());
        }
        if tempo.octave.double_strength_ratio < 0.0 {
            return invalid("double_strength_ratio must be >= 0".to_string());
        }
        if tempo.local_window_seconds <= 0.0 || !(0.0..1.0).contains(&tempo.max_local_deviation) {
            return invalid("local tempo window must be > 0 and deviation in [0, 1)".to_string());
        }

        let beat = &self.beat;
        if beat.tightness < 0.0 {
            return invalid(format!("tightness must be >= 0, got {}", beat.tightness));
        }
        if !(beat.min_lookback_beats > 0.0 && beat.min_lookback_beats < beat.max_lookback_beats) {
            return invalid("beat lookback window must satisfy 0 < min < max".to_string());
        }
        if beat.beats_per_bar == 0 {
            return invalid("beats_per_bar must be > 0".to_string());
        }

        let structure = &self.structure;
        let chroma = &structure.chroma;
        if chroma.tuning_hz <= 0.0 || chroma.fmin_hz <= 0.0 || chroma.fmin_hz >= chroma.fmax_hz {
            return invalid("chroma needs tuning_hz > 0 and 0 < fmin_hz < fmax_hz".to_string());
        }
        if chroma.soft_mapping && chroma.soft_mapping_sigma <= 0.0 {
            return invalid("soft_mapping_sigma must be > 0".to_string());
        }
        if structure.embedding_steps == 0 || structure.embedding_delay == 0 {
            return invalid("embedding_steps and embedding_delay must be > 0".to_string());
        }
        if structure.width == 0 {
            return invalid("recurrence width must be >= 1".to_string());
        }
        if structure.k == Some(0) {
            return invalid("k must be > 0 when given".to_string());
        }
        if structure.max_frames < 16 {
            return invalid("max_frames must be >= 16".to_string());
        }
        if !(structure.min_loop_seconds > 0.0 && structure.min_loop_seconds < structure.max_loop_seconds) {
            return invalid("loop length bounds must satisfy 0 < min < max".to_string());
        }
        if !(0.0..=1.0).contains(&structure.peak_threshold)
            || !(0.0..=1.0).contains(&structure.start_tolerance)
        {
            return invalid("peak_threshold and start_tolerance must be in [0, 1]".to_string());
        }
        if structure.top_k == 0 {
            return invalid("top_k must be > 0".to_string());
        }

        let refine = &self.refine;
        if !(0.0..=1.0).contains(&refine.structural_weight)
            || !(0.0..=1.0).contains(&refine.min_repeat_fraction)
        {
            return invalid("structural_weight and min_repeat_fraction must be in [0, 1]".to_string());
        }
        if refine.consistency_frame == 0 || refine.energy_window == 0 {
            return invalid("consistency_frame and energy_window must be > 0".to_string());
        }
        if refine.onset_tolerance_seconds < 0.0 || refine.onset_threshold_k < 0.0 {
            return invalid("onset_tolerance_seconds and onset_threshold_k must be >= 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.fallback.acceptance_threshold) {
            return invalid("acceptance_threshold must be in [0, 1]".to_string());
        }
        if self.fallback.loop_bars == 0 {
            return invalid("fallback loop_bars must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_documented_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.stft.hop_length, 512);
        assert_eq!(config.stft.frame_length, 2048);
        assert_eq!(config.tempo.min_bpm, 60.0);
        assert_eq!(config.tempo.max_bpm, 200.0);
        assert_eq!(config.beat.tightness, 100.0);
        assert_eq!(config.structure.width, 3);
        assert_eq!(config.structure.top_k, 10);
        assert!(config.parallel);
    }

    #[test]
    fn test_invalid_bpm_range() {
        let mut config = AnalysisConfig::default();
        config.tempo.min_bpm = 180.0;
        config.tempo.max_bpm = 60.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_bpm_outside_range() {
        let mut config = AnalysisConfig::default();
        config.tempo.default_bpm = 40.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_hop_rejected() {
        let mut config = AnalysisConfig::default();
        config.stft.hop_length = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hop_length"));
    }

    #[test]
    fn test_zero_width_rejected() {
        let mut config = AnalysisConfig::default();
        config.structure.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip_preserves_overrides() {
        let mut config = AnalysisConfig::default();
        config.tempo.prior.enabled = false;
        config.structure.mode = RecurrenceMode::Connectivity;
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
