//! The decode service: threads, hand-offs and the exactly-once callback
//!
//! Three runners participate. The concurrent pool does the CPU-bound
//! decode, the IO runner is the single writer of GPU resources and
//! performs the upload, and the UI runner receives the result callback.
//! Within one request those stages form a happens-before chain, and the
//! callback fires exactly once no matter where the pipeline fails.

use std::fmt;
use std::sync::Arc;

use tessera_core::geometry::ISize;
use tessera_core::gpu::{GpuContext, Texture};
use tessera_core::upload;

use crate::decoder::{self, DecompressResult};
use crate::descriptor::{DecodeOptions, ImageDescriptor};

/// Posts closures onto one of the pipeline's threads.
///
/// Implementations are external; the contract is fire-and-forget FIFO
/// execution for the serial (UI/IO) runners and unordered execution for
/// the concurrent pool.
pub trait TaskRunner: Send + Sync {
    fn post(&self, task: Box<dyn FnOnce() + Send>);
}

/// The three runners a decode service schedules across.
#[derive(Clone)]
pub struct TaskRunners {
    pub ui: Arc<dyn TaskRunner>,
    pub io: Arc<dyn TaskRunner>,
    pub concurrent: Arc<dyn TaskRunner>,
}

/// A decoded, uploaded image: a texture plus its dimensions.
pub struct Image {
    texture: Arc<dyn Texture>,
}

impl Image {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self { texture }
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    pub fn size(&self) -> ISize {
        self.texture.descriptor().size
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// Delivered on the UI runner, exactly once per request.
pub type ImageResult = Box<dyn FnOnce(Option<Image>) + Send>;

/// Accepts decode requests and routes them across the runners.
pub struct ImageDecodeService {
    context: Arc<dyn GpuContext>,
    runners: TaskRunners,
    options: DecodeOptions,
}

impl ImageDecodeService {
    pub fn new(context: Arc<dyn GpuContext>, runners: TaskRunners, options: DecodeOptions) -> Self {
        Self {
            context,
            runners,
            options,
        }
    }

    /// Decode `descriptor` toward `target_width` x `target_height` and
    /// deliver the result on the UI runner.
    ///
    /// The service holds its own descriptor reference for the duration
    /// of the request and releases it on the UI thread after the
    /// callback has run, so the caller may drop theirs immediately.
    pub fn decode(
        &self,
        descriptor: Arc<dyn ImageDescriptor>,
        target_width: u32,
        target_height: u32,
        result: ImageResult,
    ) {
        let ui = self.runners.ui.clone();
        let io = self.runners.io.clone();
        let context = self.context.clone();
        let options = self.options;

        let released = descriptor.clone();
        let deliver = move |image: Option<Image>| {
            ui.post(Box::new(move || {
                result(image);
                // The descriptor reference is released on the UI thread,
                // after the callback has run.
                drop(released);
            }));
        };

        self.runners.concurrent.post(Box::new(move || {
            let allocator = context.resource_allocator();
            let max_size = allocator.max_texture_size();
            let target = ISize::new(target_width, target_height);

            // Decompression always happens on the concurrent pool.
            let Some(decompressed) = decoder::decompress(
                descriptor.as_ref(),
                target,
                max_size,
                options.supports_wide_gamut,
                allocator.as_ref(),
            ) else {
                deliver(None);
                return;
            };

            // Serialize the upload through the IO runner; it is the only
            // writer of GPU resources.
            io.post(Box::new(move || {
                let image = upload_decompressed(context.as_ref(), &decompressed, options);
                deliver(image);
            }));
        }));
    }
}

/// Upload a decode result, choosing the private-blit path when the
/// platform has buffer-to-texture blits and the shared path otherwise.
fn upload_decompressed(
    context: &dyn GpuContext,
    decompressed: &DecompressResult,
    options: DecodeOptions,
) -> Option<Image> {
    let size = decompressed.image_info.size;
    let label = format!("Image({}x{})", size.width, size.height);
    let uploaded = if context.capabilities().supports_buffer_to_texture_blits() {
        upload::upload_to_private(
            context,
            decompressed.device_buffer.clone(),
            &decompressed.image_info,
            &label,
        )
    } else {
        upload::upload_to_shared(context, &decompressed.bitmap, options.create_mips, &label)
    };
    match uploaded {
        Ok(texture) => Some(Image::new(texture)),
        Err(err) => {
            log::error!("image upload failed: {err}");
            None
        }
    }
}
