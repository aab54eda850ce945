use image::GrayImage;

/// Variance of the 4-neighbour Laplacian over the interior pixels.
/// Low values mean little edge energy, i.e. a blurry frame.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    if w < 3 || h < 3 {
        return 0.0;
    }

    let pixels = gray.as_raw();
    let count = ((w - 2) * (h - 2)) as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            let idx = y * w + x;
            // integer math, the kernel output fits easily in i32
            let lap = pixels[idx - 1] as i32
                + pixels[idx + 1] as i32
                + pixels[idx - w] as i32
                + pixels[idx + w] as i32
                - 4 * pixels[idx] as i32;
            let lap = lap as f64;
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

#[derive(Debug, Clone, Copy)]
pub struct BlurCheck {
    pub threshold: f64,
}

impl BlurCheck {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn is_blurry(&self, gray: &GrayImage) -> bool {
        laplacian_variance(gray) < self.threshold
    }
}
