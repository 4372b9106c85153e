use crate::video::capture::{BgrFrame, FrameSource, PlaybackError, FALLBACK_FPS};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::time::{Duration, Instant};

pub enum PlaybackState {
    Idle,
    Playing {
        source: Box<dyn FrameSource>,
        frame_delay: Duration,
        next_frame_at: Instant,
        /// Set by a rewind, cleared by the next decoded frame
        just_rewound: bool,
    },
}

/// Timer-driven preview player. The owner calls [`Player::tick`] whenever the
/// UI wakes up and schedules the next wake-up from [`Player::time_until_next_frame`].
pub struct Player {
    state: PlaybackState,
    display_size: (u32, u32),
}

impl Player {
    pub fn new(display_size: (u32, u32)) -> Self {
        Self {
            state: PlaybackState::Idle,
            display_size,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    /// Replaces any current handle with `source`. The first frame is due immediately.
    pub fn start(&mut self, source: Box<dyn FrameSource>, now: Instant) {
        self.stop();
        let frame_delay = frame_delay_for(source.frame_rate());
        log::debug!("Playback started, frame delay {:?}", frame_delay);
        self.state = PlaybackState::Playing {
            source,
            frame_delay,
            next_frame_at: now,
            just_rewound: false,
        };
    }

    /// Releases the decode handle, if any.
    pub fn stop(&mut self) {
        if self.is_playing() {
            log::debug!("Releasing decode handle");
        }
        self.state = PlaybackState::Idle;
    }

    pub fn time_until_next_frame(&self, now: Instant) -> Option<Duration> {
        match &self.state {
            PlaybackState::Idle => None,
            PlaybackState::Playing { next_frame_at, .. } => {
                Some(next_frame_at.saturating_duration_since(now))
            }
        }
    }

    /// Advances playback if a frame is due. Returns the frame to display, or
    /// `None` when nothing is due or the stream just rewound. A read error,
    /// or a stream that is still empty right after a rewind, drops back to idle.
    pub fn tick(&mut self, now: Instant) -> Result<Option<RgbImage>, PlaybackError> {
        let (width, height) = self.display_size;
        let PlaybackState::Playing { source, frame_delay, next_frame_at, just_rewound } = &mut self.state else {
            return Ok(None);
        };
        if now < *next_frame_at {
            return Ok(None);
        }

        let result = match source.read_frame() {
            Ok(Some(frame)) => {
                *just_rewound = false;
                Ok(Some(to_display_image(frame, width, height)))
            }
            Ok(None) if *just_rewound => {
                log::warn!("Video has no frames, stopping playback");
                self.state = PlaybackState::Idle;
                return Ok(None);
            }
            Ok(None) => {
                log::debug!("End of stream, rewinding");
                *just_rewound = true;
                source.rewind().map(|_| None)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(frame) => {
                *next_frame_at = now + *frame_delay;
                Ok(frame)
            }
            Err(e) => {
                log::error!("Playback stopped: {}", e);
                self.state = PlaybackState::Idle;
                Err(e)
            }
        }
    }
}

/// Whole milliseconds per frame, at least one.
pub fn frame_delay_for(fps: f64) -> Duration {
    let fps = if fps.is_finite() && fps > 0.0 { fps } else { FALLBACK_FPS };
    let millis = (1000.0 / fps) as u64;
    Duration::from_millis(millis.max(1))
}

/// Swaps BGR to RGB and scales to the preview size.
pub fn to_display_image(frame: BgrFrame, width: u32, height: u32) -> RgbImage {
    let BgrFrame { width: src_w, height: src_h, mut data } = frame;
    for pixel in data.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }

    let Some(rgb) = RgbImage::from_raw(src_w, src_h, data) else {
        log::warn!("Frame buffer does not match {}x{}, showing blank frame", src_w, src_h);
        return RgbImage::new(width, height);
    };

    if (src_w, src_h) == (width, height) {
        rgb
    } else {
        imageops::resize(&rgb, width, height, FilterType::Lanczos3)
    }
}
