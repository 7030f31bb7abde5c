use crate::layer::Layer;

/// Rate per million of limit: the annual premium divided by the limit
/// expressed in millions. The standard like-for-like price comparison
/// across layers of different sizes. Null when the layer is unpriced.
pub fn rpm(layer: &Layer) -> Option<f64> {
    let annual = layer.annual_premium?;
    if layer.limit == 0 {
        return None;
    }
    Some(annual as f64 / (layer.limit as f64 / 1_000_000.0))
}

/// Increased limit factor relative to the preceding layer, as a
/// percentage rounded to the nearest whole number. The preceding layer
/// is the nearest one below by attachment, so quota-share co-participants
/// at the same attachment never price against each other. Null for the
/// bottom layer, when either side is unpriced, or when the preceding
/// rate is zero.
pub fn ilf(layers: &[Layer], index: usize) -> Option<u32> {
    let current = layers.get(index)?;
    let preceding = layers[..index]
        .iter()
        .rev()
        .find(|l| l.attachment < current.attachment)?;
    let current_rpm = rpm(current)?;
    let preceding_rpm = rpm(preceding)?;
    if preceding_rpm == 0.0 {
        log::debug!(
            "layer {index} ({}): preceding rate is zero, ilf undefined",
            current.carrier
        );
        return None;
    }
    Some((current_rpm / preceding_rpm * 100.0).round() as u32)
}
