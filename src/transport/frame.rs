/// Identity of a decoded frame: bumps on every pulled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle {
    /// Monotonic frame counter of the binding.
    pub generation: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// One RGBA8 frame pulled from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Handle identifying this frame.
    pub handle: FrameHandle,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Samples accumulated on the server when the frame was sent.
    pub samples: u32,
}

impl Frame {
    /// Byte length of a `width` x `height` RGBA8 frame.
    #[must_use]
    pub const fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}
