//! Animation clip metadata and the externally driven player


/// A time-bounded set of keyframe tracks from the loaded asset
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: Option<String>,
    /// Seconds, the latest keyframe over all tracks
    pub duration: f32,
    pub track_count: usize,
    /// Tracks driving morph target weights rather than node transforms
    pub weight_track_count: usize,
}

impl AnimationClip {
    pub fn new(name: Option<String>, duration: f32, track_count: usize) -> Self {
        Self { name, duration, track_count, weight_track_count: 0 }
    }

    pub fn with_weight_tracks(mut self, count: usize) -> Self {
        self.weight_track_count = count.min(self.track_count);
        self
    }

    /// Every track animates morph weights, none moves a node
    pub fn is_morph_only(&self) -> bool {
        self.track_count > 0 && self.weight_track_count == self.track_count
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play through once, then stop
    Once,
    Repeat,
}


/// Binds one clip to the model and holds its time cursor.
///
/// The player has no clock of its own: time only moves through [Self::seek].
/// In scroll mode it is started and immediately paused, plays once and holds
/// the final pose.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlayer {
    clip: AnimationClip,
    time: f32,
    playing: bool,
    paused: bool,
    loop_mode: LoopMode,
    clamp_when_finished: bool,
}

impl AnimationPlayer {
    pub fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            playing: false,
            paused: false,
            loop_mode: LoopMode::Repeat,
            clamp_when_finished: false,
        }
    }

    /// Player configured for scroll scrubbing
    pub fn for_scroll(clip: AnimationClip) -> Self {
        let mut player = Self::new(clip);
        player.play();
        player.pause();
        player.set_loop(LoopMode::Once);
        player.clamp_when_finished = true;
        player
    }

    pub fn play(&mut self) {
        self.playing = true;
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn set_loop(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    /// Forces the cursor to `time` without advancing any clock
    pub fn seek(&mut self, time: f32) {
        let duration = self.clip.duration.max(0.0);
        self.time = match self.loop_mode {
            LoopMode::Once if self.clamp_when_finished => time.clamp(0.0, duration),
            LoopMode::Once => time.max(0.0),
            LoopMode::Repeat if duration > 0.0 => time.rem_euclid(duration),
            LoopMode::Repeat => 0.0,
        };
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn duration(&self) -> f32 {
        self.clip.duration
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn clamps_when_finished(&self) -> bool {
        self.clamp_when_finished
    }
}
