//! Page scroll to animation time mapping

use crate::animation::AnimationPlayer;


/// One reading of the page's vertical scroll state, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub offset: f64,
    pub document_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(offset: f64, document_height: f64, viewport_height: f64) -> Self {
        Self { offset, document_height, viewport_height }
    }

    /// Distance the page can actually scroll
    pub fn scrollable_height(&self) -> f64 {
        self.document_height - self.viewport_height
    }

    pub fn progress(&self) -> f32 {
        scroll_progress(self.offset, self.scrollable_height())
    }
}


/// `clamp(offset / scrollable, 0, 1)`. A page that cannot scroll
/// (zero, negative or non-finite height) maps to 0.
pub fn scroll_progress(offset: f64, scrollable: f64) -> f32 {
    if !(scrollable.is_finite() && scrollable > 0.0) || offset.is_nan() {
        return 0.0;
    }
    (offset / scrollable).clamp(0.0, 1.0) as f32
}

#[inline(always)]
pub fn target_time(progress: f32, duration: f32) -> f32 {
    progress * duration
}


/// Drives an [AnimationPlayer] from scroll events.
///
/// Inactive until a clip with a positive duration is attached; there is no
/// way back to inactive.
#[derive(Debug, Default)]
pub enum ScrollScrubber {
    #[default]
    Inactive,
    Active(AnimationPlayer),
}

impl ScrollScrubber {
    /// Activates with `player`, unless its clip is empty
    pub fn attach(&mut self, player: AnimationPlayer) -> bool {
        if !(player.duration().is_finite() && player.duration() > 0.0) {
            tracing::warn!(
                "ScrollScrubber::attach(): clip {:?} has no duration, scroll control stays off",
                player.clip().name
            );
            return false;
        }
        *self = Self::Active(player);
        true
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn player(&self) -> Option<&AnimationPlayer> {
        match self {
            Self::Active(player) => Some(player),
            Self::Inactive => None,
        }
    }

    /// Seeks the player to the pose matching `metrics`.
    /// Returns the forced time, or `None` while inactive.
    pub fn scrub(&mut self, metrics: &ScrollMetrics) -> Option<f32> {
        let Self::Active(player) = self else {
            return None;
        };
        let progress = metrics.progress();
        let time = target_time(progress, player.duration());
        player.seek(time);
        tracing::debug!(
            "Scroll: {:.0}% | Animation: {:.2}s",
            progress * 100.0,
            time
        );
        Some(player.time())
    }
}
