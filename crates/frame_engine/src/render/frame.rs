//! # Frame Command Buffer
//!
//! Per-frame, single-producer recording of draw commands.
//!
//! ## Lifecycle
//!
//! `Empty -> Accumulating -> Finalized -> Consumed`, then the frame is dropped
//! and the recorder is ready for the next `begin_frame`.
//!
//! - `begin_frame` allocates a frame and opens its first scene
//! - commands go to the open scene; frame-level 2D commands go to the overlay
//! - `render_scene` finalizes the open scene with its camera and opens the next
//! - `finish` hands the frame to the executor; the last, still open scene is
//!   never finalized and is skipped

use bitflags::bitflags;
use log::error;

use super::animator::Color;
use super::error::RenderError;
use super::material::MaterialHandle;
use super::model::ModelId;
use crate::foundation::math::{Mat4, Vec3};

bitflags! {
    /// Per-scene rendering flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SceneFlags: u32 {
        /// Do not draw the world model (menus, player model previews)
        const NO_WORLD_MODEL = 1 << 0;
    }
}

/// Camera parameters of a scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneView {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    /// Viewport width in pixels
    pub width: f32,
    /// Viewport height in pixels
    pub height: f32,
    /// Eye position
    pub origin: Vec3,
    /// `[pitch, yaw, roll]` in degrees
    pub angles: [f32; 3],
    /// Culling distance; the far plane sits at twice this. `None` uses the
    /// renderer's configured distance.
    pub cull_distance: Option<f32>,
    /// Scene flags
    pub flags: SceneFlags,
}

impl SceneView {
    /// Create a view with the given viewport
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            fov_y: 90.0,
            width,
            height,
            origin: Vec3::zeros(),
            angles: [0.0; 3],
            cull_distance: None,
            flags: SceneFlags::empty(),
        }
    }

    /// Set the field of view
    pub fn with_fov(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    /// Place the camera
    pub fn with_camera(mut self, origin: Vec3, angles: [f32; 3]) -> Self {
        self.origin = origin;
        self.angles = angles;
        self
    }

    /// Override the culling distance
    pub fn with_cull_distance(mut self, distance: f32) -> Self {
        self.cull_distance = Some(distance);
        self
    }

    /// Set scene flags
    pub fn with_flags(mut self, flags: SceneFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for SceneView {
    fn default() -> Self {
        Self::new(640.0, 480.0)
    }
}

/// A model drawn with a transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInstance {
    /// Model to draw
    pub model: ModelId,
    /// Model to world transform
    pub transform: Mat4,
}

/// Screen rectangle in the 640x480 virtual screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchPic {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width; `0` keeps a 4:3 aspect from the height
    pub w: f32,
    /// Height
    pub h: f32,
    /// Texture rectangle
    pub s1: f32,
    /// Texture rectangle
    pub t1: f32,
    /// Texture rectangle
    pub s2: f32,
    /// Texture rectangle
    pub t2: f32,
    /// Material drawn
    pub material: MaterialHandle,
    /// Color passed to vertex-driven generators
    pub color: Color,
}

/// A single draw request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// 3D model instance
    Model(ModelInstance),
    /// 2D screen rectangle
    StretchPic(StretchPic),
}

/// One camera's worth of draw commands
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Camera, set on finalization
    pub view: Option<SceneView>,
    /// Commands in submission order
    pub commands: Vec<DrawCommand>,
    /// Only finalized scenes are rendered
    pub finalized: bool,
}

/// Everything recorded between `begin_frame` and `finish`
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Scenes in submission order
    pub scenes: Vec<Scene>,
    /// Screen-space commands drawn after every scene
    pub overlay: Vec<StretchPic>,
}

impl Frame {
    /// Scenes that will be rendered
    pub fn finalized_scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter().filter(|scene| scene.finalized)
    }

    fn open_scene(&mut self) -> &mut Scene {
        if self.scenes.last().map_or(true, |scene| scene.finalized) {
            self.scenes.push(Scene::default());
        }
        let last = self.scenes.len() - 1;
        &mut self.scenes[last]
    }
}

/// Recorder lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame exists
    Empty,
    /// Commands are being appended
    Accumulating,
    /// Handed to the executor
    Finalized,
    /// Executed; ready for discard
    Consumed,
}

/// Builds exactly one frame at a time
pub struct FrameRecorder {
    state: FrameState,
    frame: Frame,
}

impl Default for FrameRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRecorder {
    /// Create an idle recorder
    pub fn new() -> Self {
        Self {
            state: FrameState::Empty,
            frame: Frame::default(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Start a new frame with one open scene.
    ///
    /// Starting a frame while another is still accumulating is a programming
    /// error: it panics in debug builds and discards the unfinished frame in
    /// release builds.
    pub fn begin_frame(&mut self) {
        if self.state == FrameState::Accumulating {
            error!("begin_frame called while a frame is still accumulating, discarding it");
            debug_assert!(false, "begin_frame called while a frame is still accumulating");
        }

        self.frame = Frame::default();
        self.frame.scenes.push(Scene::default());
        self.state = FrameState::Accumulating;
    }

    /// Append a command. 3D and 2D commands alike go to the open scene and
    /// are only drawn if that scene is finalized.
    pub fn submit(&mut self, command: DrawCommand) -> Result<(), RenderError> {
        self.expect_accumulating("submit a command")?;
        self.frame.open_scene().commands.push(command);
        Ok(())
    }

    /// Append a frame-level 2D command, drawn regardless of scenes
    pub fn submit_overlay(&mut self, pic: StretchPic) -> Result<(), RenderError> {
        self.expect_accumulating("submit an overlay command")?;
        self.frame.overlay.push(pic);
        Ok(())
    }

    /// Finalize the open scene with `view` and open the next one
    pub fn finalize_scene(&mut self, view: SceneView) -> Result<(), RenderError> {
        self.expect_accumulating("finalize a scene")?;
        let scene = self.frame.open_scene();
        scene.view = Some(view);
        scene.finalized = true;
        self.frame.scenes.push(Scene::default());
        Ok(())
    }

    /// Hand the completed frame over for execution
    pub fn finish(&mut self) -> Result<Frame, RenderError> {
        self.expect_accumulating("finish the frame")?;
        self.state = FrameState::Finalized;
        Ok(std::mem::take(&mut self.frame))
    }

    /// Record that the finished frame has been executed
    pub fn mark_consumed(&mut self) -> Result<(), RenderError> {
        if self.state != FrameState::Finalized {
            return Err(RenderError::InvalidFrameState {
                operation: "mark the frame consumed",
                state: self.state,
            });
        }
        self.state = FrameState::Consumed;
        Ok(())
    }

    fn expect_accumulating(&self, operation: &'static str) -> Result<(), RenderError> {
        if self.state == FrameState::Accumulating {
            Ok(())
        } else {
            Err(RenderError::InvalidFrameState { operation, state: self.state })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pic() -> StretchPic {
        StretchPic {
            x: 0.0,
            y: 0.0,
            w: 32.0,
            h: 32.0,
            s1: 0.0,
            t1: 0.0,
            s2: 1.0,
            t2: 1.0,
            material: MaterialHandle(1),
            color: [1.0; 4],
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut recorder = FrameRecorder::new();
        assert_eq!(recorder.state(), FrameState::Empty);

        recorder.begin_frame();
        assert_eq!(recorder.state(), FrameState::Accumulating);
        recorder.submit(DrawCommand::StretchPic(pic())).unwrap();
        recorder.finalize_scene(SceneView::default()).unwrap();
        recorder.submit_overlay(pic()).unwrap();

        let frame = recorder.finish().unwrap();
        assert_eq!(recorder.state(), FrameState::Finalized);
        assert_eq!(frame.scenes.len(), 2);
        assert_eq!(frame.finalized_scenes().count(), 1);
        assert_eq!(frame.overlay.len(), 1);

        recorder.mark_consumed().unwrap();
        assert_eq!(recorder.state(), FrameState::Consumed);
        recorder.begin_frame();
        assert_eq!(recorder.state(), FrameState::Accumulating);
    }

    #[test]
    fn test_commands_rejected_outside_accumulation() {
        let mut recorder = FrameRecorder::new();
        let err = recorder.submit(DrawCommand::StretchPic(pic())).unwrap_err();
        assert_eq!(
            err,
            RenderError::InvalidFrameState { operation: "submit a command", state: FrameState::Empty }
        );
        assert!(!err.is_fatal());
        assert!(recorder.finish().is_err());
        assert!(recorder.mark_consumed().is_err());
    }

    #[test]
    fn test_unfinalized_scene_kept_but_skipped() {
        let mut recorder = FrameRecorder::new();
        recorder.begin_frame();
        recorder.submit(DrawCommand::StretchPic(pic())).unwrap();
        let frame = recorder.finish().unwrap();
        assert_eq!(frame.scenes.len(), 1);
        assert_eq!(frame.scenes[0].commands.len(), 1);
        assert_eq!(frame.finalized_scenes().count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "still accumulating")]
    fn test_nested_begin_frame_panics_in_debug() {
        let mut recorder = FrameRecorder::new();
        recorder.begin_frame();
        recorder.begin_frame();
    }
}
