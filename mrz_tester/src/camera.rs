// THEORY:
// `CameraSource` is the live `FrameSource`: an OpenCV capture device read one
// BGR frame at a time and converted to RGB for the engine. It only exists with
// the `camera` feature so the rest of the harness builds without OpenCV.

use image::RgbImage;
use mrz_vision::{Frame, FrameSource, SourceError};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

fn read_error(e: opencv::Error) -> SourceError {
    SourceError::Read(e.to_string())
}

pub struct CameraSource {
    device: i32,
    width: u32,
    height: u32,
    capture: Option<VideoCapture>,
    bgr: Mat,
}

impl CameraSource {
    pub fn new(device: i32, width: u32, height: u32) -> Self {
        Self {
            device,
            width,
            height,
            capture: None,
            bgr: Mat::default(),
        }
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<(), SourceError> {
        let unavailable = |e: opencv::Error| SourceError::Unavailable(format!("camera {}: {e}", self.device));
        let mut capture = VideoCapture::new(self.device, videoio::CAP_ANY).map_err(unavailable)?;
        if !capture.is_opened().map_err(unavailable)? {
            return Err(SourceError::Unavailable(format!("camera {} did not open", self.device)));
        }
        capture
            .set(videoio::CAP_PROP_FRAME_WIDTH, self.width as f64)
            .map_err(unavailable)?;
        capture
            .set(videoio::CAP_PROP_FRAME_HEIGHT, self.height as f64)
            .map_err(unavailable)?;
        self.capture = Some(capture);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| SourceError::Read("camera is not open".into()))?;
        if !capture.read(&mut self.bgr).map_err(read_error)? || self.bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(read_error)?;
        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let pixels = rgb.data_bytes().map_err(read_error)?.to_vec();
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| SourceError::Read(format!("unexpected buffer size for {width}x{height}")))?;
        Ok(Some(Frame::new(image)))
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                log::warn!("[CAMERA] release failed: {e}");
            }
        }
    }
}
