use super::*;

#[test]
fn unit_values_clip_and_round() {
    assert_eq!(quantize_unit(-3.0), 0);
    assert_eq!(quantize_unit(0.0), 0);
    assert_eq!(quantize_unit(0.5), 128);
    assert_eq!(quantize_unit(1.0), 255);
    assert_eq!(quantize_unit(12.5), 255);
    assert_eq!(quantize_unit(f32::NAN), 0);
}

#[test]
fn rgb_quantization_uses_color_layer() {
    let img = LayeredImage::new(2, 1)
        .with_layer(Channel::Color, vec![0.0, 0.5, 1.0, 2.0, -1.0, 0.25])
        .unwrap();
    let q = quantize_rgb8(&img).unwrap();
    assert_eq!(q.channels, 3);
    assert_eq!(q.data, vec![0, 128, 255, 255, 0, 64]);
}

#[test]
fn rgb_quantization_without_color_fails() {
    let img = LayeredImage::new(1, 1)
        .with_layer(Channel::Depth, vec![4.0])
        .unwrap();
    assert!(quantize_rgb8(&img).is_err());
}

#[test]
fn quantization_is_deterministic() {
    let m = Matte::new(3, 1, vec![0.1, 0.6, 0.9]).unwrap();
    assert_eq!(quantize_gray8(&m), quantize_gray8(&m));
}
