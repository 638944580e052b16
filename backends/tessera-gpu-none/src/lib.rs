//! GPU-None Backend - the whole pipeline with no GPU in sight
//!
//! Every contract from `tessera-core::gpu`, implemented over plain RAM:
//! buffers are shared byte slabs, textures keep their mip levels in
//! vectors, and command buffers execute their blit commands synchronously
//! on submit. Tests and headless embedders get the exact upload and
//! ordering semantics of a real backend — copies land where they should,
//! mip chains really get generated, shared buffer/texture memory really
//! is shared — without touching a graphics API.

mod runner;

pub use runner::{decode_runners, RayonTaskRunner, SerialTaskRunner};

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tessera_core::bitmap::{new_host_storage, HostStorage, TextureMapping};
use tessera_core::geometry::ISize;
use tessera_core::gpu::{
    Allocator, BlitPass, BufferDescriptor, BufferView, Capabilities, CommandBuffer, DeviceBuffer,
    GpuContext, Texture, TextureDescriptor,
};
use tessera_core::pixel::PixelFormat;

/// Capability switches, set per test or embedding.
#[derive(Debug, Clone, Copy)]
pub struct SoftCapabilities {
    pub shared_device_buffer_texture_memory: bool,
    pub buffer_to_texture_blits: bool,
}

impl SoftCapabilities {
    pub fn new(shared_memory: bool, buffer_blits: bool) -> Self {
        Self {
            shared_device_buffer_texture_memory: shared_memory,
            buffer_to_texture_blits: buffer_blits,
        }
    }

    /// Unified-memory style platform: textures can view buffer memory.
    pub fn shared_memory() -> Self {
        Self::new(true, false)
    }

    /// Discrete-GPU style platform: uploads go through blit passes.
    pub fn discrete() -> Self {
        Self::new(false, true)
    }

    /// Neither fast path; everything copies through `set_contents`.
    pub fn minimal() -> Self {
        Self::new(false, false)
    }
}

impl Capabilities for SoftCapabilities {
    fn supports_shared_device_buffer_texture_memory(&self) -> bool {
        self.shared_device_buffer_texture_memory
    }

    fn supports_buffer_to_texture_blits(&self) -> bool {
        self.buffer_to_texture_blits
    }
}

/// Allocates RAM-backed buffers and textures.
pub struct SoftAllocator {
    max_texture_size: ISize,
    min_row_alignment: usize,
    fail_allocations: AtomicBool,
}

impl SoftAllocator {
    pub fn new() -> Self {
        Self {
            max_texture_size: ISize::new(4096, 4096),
            min_row_alignment: 1,
            fail_allocations: AtomicBool::new(false),
        }
    }

    pub fn with_max_texture_size(mut self, size: ISize) -> Self {
        self.max_texture_size = size;
        self
    }

    pub fn with_min_bytes_per_row(mut self, alignment: usize) -> Self {
        self.min_row_alignment = alignment;
        self
    }

    /// Make every subsequent allocation fail, for error-path tests.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Release);
    }

    fn failing(&self) -> bool {
        self.fail_allocations.load(Ordering::Acquire)
    }
}

impl Default for SoftAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for SoftAllocator {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Option<Arc<dyn DeviceBuffer>> {
        if self.failing() || descriptor.size == 0 {
            return None;
        }
        Some(Arc::new(SoftBuffer {
            storage: new_host_storage(descriptor.size),
            length: descriptor.size,
        }))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>> {
        if self.failing()
            || !descriptor.is_valid()
            || descriptor.size.width > self.max_texture_size.width
            || descriptor.size.height > self.max_texture_size.height
        {
            return None;
        }
        Some(Arc::new(SoftTexture::new_owned(*descriptor)))
    }

    fn min_bytes_per_row(&self, _format: PixelFormat) -> usize {
        self.min_row_alignment
    }

    fn max_texture_size(&self) -> ISize {
        self.max_texture_size
    }
}

/// A host-visible buffer: a length and a shared byte slab.
pub struct SoftBuffer {
    storage: HostStorage,
    length: usize,
}

impl DeviceBuffer for SoftBuffer {
    fn length(&self) -> usize {
        self.length
    }

    fn host_storage(&self) -> Option<HostStorage> {
        Some(self.storage.clone())
    }

    fn as_texture(
        &self,
        descriptor: &TextureDescriptor,
        _row_bytes: usize,
    ) -> Option<Arc<dyn Texture>> {
        if descriptor.byte_size_of_base_mip() > self.length {
            return None;
        }
        Some(Arc::new(SoftTexture::new_shared(
            *descriptor,
            self.storage.clone(),
        )))
    }
}

enum Backing {
    /// The texture owns its base level.
    Owned(Mutex<Vec<u8>>),
    /// The base level aliases a device buffer's storage.
    Shared(HostStorage),
}

/// A texture whose levels are byte vectors.
pub struct SoftTexture {
    descriptor: TextureDescriptor,
    base: Backing,
    mips: Mutex<Vec<Vec<u8>>>,
    label: Mutex<String>,
    retained: Mutex<Option<TextureMapping>>,
}

impl SoftTexture {
    fn new_owned(descriptor: TextureDescriptor) -> Self {
        Self {
            descriptor,
            base: Backing::Owned(Mutex::new(vec![0u8; descriptor.byte_size_of_base_mip()])),
            mips: Mutex::new(Vec::new()),
            label: Mutex::new(String::new()),
            retained: Mutex::new(None),
        }
    }

    fn new_shared(descriptor: TextureDescriptor, storage: HostStorage) -> Self {
        Self {
            descriptor,
            base: Backing::Shared(storage),
            mips: Mutex::new(Vec::new()),
            label: Mutex::new(String::new()),
            retained: Mutex::new(None),
        }
    }

    /// A copy of the base-level pixels.
    pub fn base_pixels(&self) -> Vec<u8> {
        match &self.base {
            Backing::Owned(pixels) => pixels.lock().clone(),
            Backing::Shared(storage) => {
                let guard = storage.read();
                let end = self.descriptor.byte_size_of_base_mip().min(guard.len());
                guard[..end].to_vec()
            }
        }
    }

    /// Number of levels currently holding pixels (base plus generated).
    pub fn generated_level_count(&self) -> usize {
        1 + self.mips.lock().len()
    }

    /// A copy of one generated mip level (1-based; level 0 is the base).
    pub fn mip_pixels(&self, level: usize) -> Option<Vec<u8>> {
        if level == 0 {
            return Some(self.base_pixels());
        }
        self.mips.lock().get(level - 1).cloned()
    }

    pub fn label(&self) -> String {
        self.label.lock().clone()
    }

    /// Whether a `set_contents` mapping is still retained.
    pub fn retains_mapping(&self) -> bool {
        self.retained.lock().is_some()
    }

    fn write_base(&self, bytes: &[u8]) {
        match &self.base {
            Backing::Owned(pixels) => {
                let mut guard = pixels.lock();
                let end = bytes.len().min(guard.len());
                guard[..end].copy_from_slice(&bytes[..end]);
            }
            Backing::Shared(storage) => {
                let mut guard = storage.write();
                let end = bytes.len().min(guard.len());
                guard[..end].copy_from_slice(&bytes[..end]);
            }
        }
    }

    /// Rebuild every mip level from the base pixels.
    fn generate_mipmaps(&self) {
        let descriptor = self.descriptor;
        let mut levels = self.mips.lock();
        levels.clear();
        let mut prev = self.base_pixels();
        let mut width = descriptor.size.width.max(1);
        let mut height = descriptor.size.height.max(1);
        for _ in 1..descriptor.mip_count {
            let next_width = (width / 2).max(1);
            let next_height = (height / 2).max(1);
            let next = downsample(
                &prev,
                width,
                height,
                next_width,
                next_height,
                descriptor.format,
            );
            prev = next.clone();
            levels.push(next);
            width = next_width;
            height = next_height;
        }
    }
}

impl Texture for SoftTexture {
    fn descriptor(&self) -> TextureDescriptor {
        self.descriptor
    }

    fn set_contents(&self, mapping: TextureMapping) -> bool {
        // Stage through a copy: the mapping may view the very storage
        // this texture is backed by.
        let bytes = mapping.read(|bytes| bytes.to_vec());
        self.write_base(&bytes);
        *self.retained.lock() = Some(mapping);
        true
    }

    fn set_label(&self, label: &str) {
        *self.label.lock() = label.to_string();
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Box-filter (8-bit formats) or nearest (wider texels) downsample.
fn downsample(
    prev: &[u8],
    prev_width: u32,
    prev_height: u32,
    next_width: u32,
    next_height: u32,
    format: PixelFormat,
) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let averaged = matches!(
        format,
        PixelFormat::A8Unorm | PixelFormat::R8G8B8A8Unorm
    );
    let mut out = vec![0u8; (next_width * next_height) as usize * bpp];
    let index = |x: u32, y: u32| (y * prev_width + x) as usize * bpp;

    for y in 0..next_height {
        for x in 0..next_width {
            let x0 = (x * 2).min(prev_width - 1);
            let x1 = (x * 2 + 1).min(prev_width - 1);
            let y0 = (y * 2).min(prev_height - 1);
            let y1 = (y * 2 + 1).min(prev_height - 1);
            let dst = (y * next_width + x) as usize * bpp;
            if averaged {
                for channel in 0..bpp {
                    let sum = u32::from(prev[index(x0, y0) + channel])
                        + u32::from(prev[index(x1, y0) + channel])
                        + u32::from(prev[index(x0, y1) + channel])
                        + u32::from(prev[index(x1, y1) + channel]);
                    out[dst + channel] = (sum / 4) as u8;
                }
            } else {
                let src = index(x0, y0);
                out[dst..dst + bpp].copy_from_slice(&prev[src..src + bpp]);
            }
        }
    }
    out
}

/// The software device handle.
pub struct SoftContext {
    allocator: Arc<SoftAllocator>,
    capabilities: Arc<SoftCapabilities>,
}

impl SoftContext {
    pub fn new(capabilities: SoftCapabilities) -> Self {
        Self::with_allocator(Arc::new(SoftAllocator::new()), capabilities)
    }

    pub fn with_allocator(allocator: Arc<SoftAllocator>, capabilities: SoftCapabilities) -> Self {
        Self {
            allocator,
            capabilities: Arc::new(capabilities),
        }
    }

    pub fn allocator(&self) -> &Arc<SoftAllocator> {
        &self.allocator
    }
}

impl GpuContext for SoftContext {
    fn resource_allocator(&self) -> Arc<dyn Allocator> {
        self.allocator.clone()
    }

    fn capabilities(&self) -> Arc<dyn Capabilities> {
        self.capabilities.clone()
    }

    fn create_command_buffer(&self) -> Option<Arc<dyn CommandBuffer>> {
        Some(Arc::new(SoftCommandBuffer::new()))
    }
}

enum BlitCommand {
    Copy {
        view: BufferView,
        texture: Arc<dyn Texture>,
    },
    GenerateMipmaps {
        texture: Arc<dyn Texture>,
    },
}

/// A single-use command buffer executing synchronously on submit.
pub struct SoftCommandBuffer {
    queue: Arc<Mutex<Vec<BlitCommand>>>,
    label: Mutex<String>,
    submitted: AtomicBool,
}

impl SoftCommandBuffer {
    fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            label: Mutex::new(String::new()),
            submitted: AtomicBool::new(false),
        }
    }

    pub fn label(&self) -> String {
        self.label.lock().clone()
    }
}

impl CommandBuffer for SoftCommandBuffer {
    fn set_label(&self, label: &str) {
        *self.label.lock() = label.to_string();
    }

    fn create_blit_pass(&self) -> Option<Box<dyn BlitPass>> {
        Some(Box::new(SoftBlitPass {
            commands: Vec::new(),
            queue: self.queue.clone(),
            label: String::new(),
        }))
    }

    fn submit(&self) -> bool {
        if self.submitted.swap(true, Ordering::AcqRel) {
            return false;
        }
        let commands = std::mem::take(&mut *self.queue.lock());
        for command in commands {
            if !execute(command) {
                return false;
            }
        }
        true
    }

    fn wait_until_scheduled(&self) {
        // Synchronous execution: submitted work is already scheduled.
    }
}

fn execute(command: BlitCommand) -> bool {
    match command {
        BlitCommand::Copy { view, texture } => {
            let Some(storage) = view.buffer.host_storage() else {
                log::error!("blit copy from a buffer with no host storage");
                return false;
            };
            let bytes = {
                let guard = storage.read();
                let start = view.offset.min(guard.len());
                let end = (view.offset + view.length).min(guard.len());
                guard[start..end].to_vec()
            };
            let Some(texture) = texture.as_any().downcast_ref::<SoftTexture>() else {
                log::error!("blit copy into a foreign texture type");
                return false;
            };
            texture.write_base(&bytes);
            true
        }
        BlitCommand::GenerateMipmaps { texture } => {
            let Some(texture) = texture.as_any().downcast_ref::<SoftTexture>() else {
                log::error!("mipmap generation on a foreign texture type");
                return false;
            };
            texture.generate_mipmaps();
            true
        }
    }
}

struct SoftBlitPass {
    commands: Vec<BlitCommand>,
    queue: Arc<Mutex<Vec<BlitCommand>>>,
    label: String,
}

impl BlitPass for SoftBlitPass {
    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    fn add_copy(&mut self, view: BufferView, texture: Arc<dyn Texture>) {
        self.commands.push(BlitCommand::Copy { view, texture });
    }

    fn generate_mipmap(&mut self, texture: Arc<dyn Texture>) {
        self.commands.push(BlitCommand::GenerateMipmaps { texture });
    }

    fn encode(&mut self, _allocator: &dyn Allocator) -> bool {
        log::debug!(
            "encoding blit pass {:?} with {} commands",
            self.label,
            self.commands.len()
        );
        self.queue.lock().append(&mut self.commands);
        true
    }
}
