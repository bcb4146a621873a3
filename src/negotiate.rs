//! Encoder and pixel format negotiation rules.
//!
//! These are backend independent: the capability questions (does the
//! container accept this codec, which formats does the encoder take, which
//! of them is closest to the source) are answered by closures.

use ffmpeg_next::format::Pixel;

use crate::error::PumpError;

/// Pick the first preferred encoder the container accepts, falling back to
/// the container's default.
///
/// `preferred` is walked lazily in order. The default is only computed
/// when no preferred candidate passes `accepts`, and is returned without
/// being checked.
pub fn select_encoder<C>(
    preferred: impl IntoIterator<Item = C>,
    accepts: impl Fn(&C) -> bool,
    default: impl FnOnce() -> Option<C>,
) -> Option<C> {
    preferred
        .into_iter()
        .find(|candidate| accepts(candidate))
        .or_else(default)
}

/// Decide the pixel format an encoder will work in.
///
/// `supported` is the encoder's declared list, `None` if it accepts any
/// format. A requested format must be on the list. Without a request the
/// source format is used when the list is unrestricted, otherwise `closest`
/// picks from the list.
///
/// # Errors
///
/// - [`PumpError::UnsupportedPixelFormat`] if the requested format is not
///   supported by the encoder.
/// - [`PumpError::UnknownPixelFormat`] if [`Pixel::None`] is requested.
///
/// # Example
///
/// ```
/// use framepump::Pixel;
/// use framepump::negotiate::negotiate_pixel_format;
///
/// let supported = [Pixel::YUV420P, Pixel::YUV444P];
/// let chosen = negotiate_pixel_format(
///     None,
///     Some(&supported),
///     Pixel::RGB24,
///     |candidates, _| candidates[1],
///     "example",
/// )?;
/// assert_eq!(chosen, Pixel::YUV444P);
/// # Ok::<(), framepump::PumpError>(())
/// ```
pub fn negotiate_pixel_format(
    desired: Option<Pixel>,
    supported: Option<&[Pixel]>,
    source: Pixel,
    closest: impl FnOnce(&[Pixel], Pixel) -> Pixel,
    encoder_name: &str,
) -> Result<Pixel, PumpError> {
    let supported = supported.filter(|list| !list.is_empty());

    match (desired, supported) {
        (Some(Pixel::None), _) => Err(PumpError::UnknownPixelFormat("none".to_string())),
        (Some(desired), Some(list)) if !list.contains(&desired) => {
            Err(PumpError::UnsupportedPixelFormat {
                format: desired,
                encoder: encoder_name.to_string(),
            })
        }
        (Some(desired), _) => Ok(desired),
        (None, Some(list)) => Ok(closest(list, source)),
        (None, None) => Ok(source),
    }
}
