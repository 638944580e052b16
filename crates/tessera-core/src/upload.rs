//! Moving pixels into GPU textures
//!
//! Two ways up: a blit pass into a device-private texture with a full mip
//! chain, or `set_contents` into a host-visible texture. The zero-copy
//! variant for shared-memory platforms ([`wrap_buffer_as_texture`]) never
//! touches a command buffer at all — the texture simply views the buffer.

use std::sync::Arc;

use crate::bitmap::HostBitmap;
use crate::error::{AllocationError, UploadError};
use crate::gpu::{
    BufferView, CompressionType, DeviceBuffer, GpuContext, StorageMode, Texture, TextureDescriptor,
};
use crate::pixel::{ImageInfo, PixelFormat};

/// Upload a device buffer into a fresh device-private texture.
///
/// Creates the texture with a full mip chain and lossy compression, blits
/// the buffer into the base level and generates mips in the same pass.
pub fn upload_to_private(
    context: &dyn GpuContext,
    buffer: Arc<dyn DeviceBuffer>,
    info: &ImageInfo,
    label: &str,
) -> Result<Arc<dyn Texture>, UploadError> {
    let format = info
        .color_type
        .to_pixel_format()
        .ok_or(UploadError::UnsupportedPixelFormat(info.color_type))?;

    let descriptor = TextureDescriptor {
        storage_mode: StorageMode::DevicePrivate,
        format,
        size: info.size,
        mip_count: info.size.mip_count(),
        compression: CompressionType::Lossy,
    };

    let allocator = context.resource_allocator();
    let texture = allocator
        .create_texture(&descriptor)
        .ok_or(AllocationError::Texture {
            width: info.size.width,
            height: info.size.height,
        })?;
    texture.set_label(label);

    let command_buffer = context
        .create_command_buffer()
        .ok_or(UploadError::CommandBuffer)?;
    command_buffer.set_label("Mipmap Command Buffer");

    let mut blit_pass = command_buffer
        .create_blit_pass()
        .ok_or(UploadError::BlitPass)?;
    blit_pass.set_label("Mipmap Blit Pass");
    blit_pass.add_copy(BufferView::whole(buffer), texture.clone());
    if descriptor.mip_count > 1 {
        blit_pass.generate_mipmap(texture.clone());
    }

    if !blit_pass.encode(allocator.as_ref()) {
        return Err(UploadError::Encode);
    }
    if !command_buffer.submit() {
        return Err(UploadError::Submit);
    }

    Ok(texture)
}

/// Upload a host bitmap into a host-visible texture via `set_contents`.
///
/// When mips are requested, a follow-up blit pass generates them and the
/// call waits until that pass is scheduled before returning, so the
/// caller may release its bitmap reference — the texture retains the
/// mapping until consumption.
pub fn upload_to_shared(
    context: &dyn GpuContext,
    bitmap: &HostBitmap,
    create_mips: bool,
    label: &str,
) -> Result<Arc<dyn Texture>, UploadError> {
    let info = *bitmap.info();
    let format = info
        .color_type
        .to_pixel_format()
        .ok_or(UploadError::UnsupportedPixelFormat(info.color_type))?;

    let descriptor = TextureDescriptor {
        storage_mode: StorageMode::HostVisible,
        format,
        size: info.size,
        mip_count: if create_mips {
            info.size.mip_count()
        } else {
            1
        },
        compression: CompressionType::None,
    };

    let allocator = context.resource_allocator();
    let texture = allocator
        .create_texture(&descriptor)
        .ok_or(AllocationError::Texture {
            width: info.size.width,
            height: info.size.height,
        })?;

    if !texture.set_contents(bitmap.mapping()) {
        return Err(UploadError::SetContents);
    }
    texture.set_label(label);

    if descriptor.mip_count > 1 && create_mips {
        let command_buffer = context
            .create_command_buffer()
            .ok_or(UploadError::CommandBuffer)?;
        command_buffer.set_label("Mipmap Command Buffer");

        let mut blit_pass = command_buffer
            .create_blit_pass()
            .ok_or(UploadError::BlitPass)?;
        blit_pass.set_label("Mipmap Blit Pass");
        blit_pass.generate_mipmap(texture.clone());

        if !blit_pass.encode(allocator.as_ref()) {
            return Err(UploadError::Encode);
        }
        if !command_buffer.submit() {
            return Err(UploadError::Submit);
        }
        command_buffer.wait_until_scheduled();
    }

    Ok(texture)
}

/// View a host-visible buffer as a linear texture without copying.
///
/// Refused when the bitmap's row layout cannot back a linear texture of
/// the requested format, in which case the caller must fall back to an
/// explicit copy.
pub fn wrap_buffer_as_texture(
    buffer: &Arc<dyn DeviceBuffer>,
    bitmap: &HostBitmap,
    format: PixelFormat,
    label: &str,
) -> Result<Arc<dyn Texture>, UploadError> {
    let size = bitmap.size();
    let descriptor = TextureDescriptor::new(StorageMode::HostVisible, format, size);

    if bitmap.row_bytes() * size.height as usize != descriptor.byte_size_of_base_mip() {
        return Err(UploadError::NonLinearLayout);
    }

    let texture = buffer
        .as_texture(&descriptor, descriptor.bytes_per_row())
        .ok_or(AllocationError::Texture {
            width: size.width,
            height: size.height,
        })?;
    if !texture.is_valid() {
        return Err(UploadError::from(AllocationError::Texture {
            width: size.width,
            height: size.height,
        }));
    }
    texture.set_label(label);
    Ok(texture)
}
