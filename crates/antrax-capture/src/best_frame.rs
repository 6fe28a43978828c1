use image::RgbImage;

/// Highest-quality rendered frame of the current episode.
#[derive(Debug, Clone, Default)]
pub struct BestFrameBuffer {
    image: Option<RgbImage>,
    best_score: f64,
}

impl BestFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_ref()
    }

    /// Store the frame produced by `render` when `score` strictly beats the
    /// current best. Rendering only happens on improvement.
    pub fn offer<F>(&mut self, score: f64, render: F) -> bool
    where
        F: FnOnce() -> RgbImage,
    {
        if score <= self.best_score {
            return false;
        }
        self.image = Some(render());
        self.best_score = score;
        true
    }

    pub fn take(&mut self) -> Option<RgbImage> {
        self.image.take()
    }

    pub fn reset(&mut self) {
        self.image = None;
        self.best_score = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_offer_keeps_strictly_better() {
        let mut buffer = BestFrameBuffer::new();
        assert!(buffer.offer(50.0, || RgbImage::from_pixel(2, 2, Rgb([1, 1, 1]))));
        assert!(!buffer.offer(50.0, || panic!("equal score must not render")));
        assert!(!buffer.offer(10.0, || panic!("lower score must not render")));
        assert!(buffer.offer(60.0, || RgbImage::from_pixel(2, 2, Rgb([2, 2, 2]))));

        assert_eq!(buffer.best_score(), 60.0);
        assert_eq!(buffer.image().unwrap().get_pixel(0, 0), &Rgb([2, 2, 2]));
    }

    #[test]
    fn test_reset_clears_score() {
        let mut buffer = BestFrameBuffer::new();
        buffer.offer(90.0, || RgbImage::new(1, 1));
        buffer.reset();
        assert_eq!(buffer.best_score(), 0.0);
        assert!(buffer.take().is_none());
    }
}
