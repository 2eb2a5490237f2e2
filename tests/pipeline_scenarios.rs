//! End-to-end pipeline scenarios
//!
//! Every request is built from synthetic images generated in-process. The model
//! directory points at an empty temporary directory, so the learned tier is always
//! unavailable and results are deterministic.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use idphoto::{
    EnhanceOptions, IdPhotoProcessor, ImageIOService, OutputFormat, ProcessingRequest,
    ProcessingResult, Result, SegmentationTier, ServiceConfig,
};
use std::io::Cursor;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn processor(classical_fallback: bool) -> Result<(IdPhotoProcessor, TempDir)> {
    init_logging();
    let model_dir = TempDir::new()?;
    let config = ServiceConfig::builder()
        .model_dir(model_dir.path())
        .classical_fallback(classical_fallback)
        .build()?;
    Ok((IdPhotoProcessor::new(config)?, model_dir))
}

/// Light backdrop with a darker, head-and-shoulders shaped subject
fn portrait(width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, Rgb([235, 235, 240]));
    let (cx, head_cy) = (width as f32 / 2.0, height as f32 * 0.35);
    let head_r = width as f32 * 0.18;
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - head_cy;
            let in_head = dx * dx + dy * dy < head_r * head_r;
            let in_body = y as f32 > height as f32 * 0.55 && dx.abs() < width as f32 * 0.35;
            if in_head || in_body {
                image.put_pixel(x, y, Rgb([70, 50, 45]));
            }
        }
    }
    image
}

fn encode_payload(image: RgbImage) -> String {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    ImageIOService::to_data_url(&bytes, OutputFormat::Png)
}

fn png_request(image: RgbImage, background: &str) -> ProcessingRequest {
    ProcessingRequest {
        background_color: background.to_string(),
        format: "png".to_string(),
        ..ProcessingRequest::new(encode_payload(image))
    }
}

fn decode_output(data_url: &str) -> DynamicImage {
    ImageIOService::decode_payload(data_url).unwrap()
}

#[tokio::test]
async fn test_portrait_on_colored_canvas() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let request = png_request(portrait(600, 800), "#112233");

    let response = processor.process_to_response(&request).await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.width, Some(295));
    assert_eq!(response.height, Some(413));
    assert!(!response.used_gpu);

    let data_url = response.image_data.unwrap();
    assert!(data_url.starts_with("data:image/png;base64,"));
    let output = decode_output(&data_url);
    assert_eq!(output.dimensions(), (295, 413));
    assert_eq!(response.file_size, Some(ImageIOService::decode_base64(&data_url)?.len()));

    // 600x800 fits as 295x393 with a 10 pixel band above and below
    for (x, y) in [(0, 0), (294, 0), (0, 412), (294, 412), (147, 5)] {
        assert_eq!(output.get_pixel(x, y).0, [0x11, 0x22, 0x33, 255], "pixel ({x}, {y})");
    }
    Ok(())
}

#[tokio::test]
async fn test_hex_without_hash() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let response = processor
        .process_to_response(&png_request(portrait(120, 160), "112233"))
        .await;

    assert!(response.success);
    let output = decode_output(&response.image_data.unwrap());
    assert_eq!(output.get_pixel(0, 0).0, [0x11, 0x22, 0x33, 255]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_background_color() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let response = processor
        .process_to_response(&png_request(portrait(120, 160), "bad"))
        .await;

    assert!(!response.success);
    assert!(response.image_data.is_none());
    assert!(response.error.unwrap().starts_with("Composition error"));
    Ok(())
}

#[tokio::test]
async fn test_uniform_image_is_all_background() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let request = png_request(RgbImage::from_pixel(200, 260, Rgb([128, 128, 128])), "#438EDB");

    match processor.process(&request).await {
        ProcessingResult::Success(output) => {
            assert_eq!(output.tier, SegmentationTier::Classical);
            let image = ImageIOService::load_from_bytes(&output.bytes)?.into_rgba8();
            assert!(image.pixels().all(|p| p.0 == [0x43, 0x8E, 0xDB, 255]));
        },
        ProcessingResult::Failure(e) => panic!("unexpected failure: {e}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_jpeg_output_within_tolerance() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let request = ProcessingRequest {
        quality: 0.95,
        ..ProcessingRequest::new(encode_payload(portrait(300, 400)))
    };

    let response = processor.process_to_response(&request).await;
    assert!(response.success);
    let data_url = response.image_data.unwrap();
    assert!(data_url.starts_with("data:image/jpeg;base64,"));

    let output = decode_output(&data_url).into_rgb8();
    assert_eq!(output.dimensions(), (295, 413));
    for channel in output.get_pixel(2, 2).0 {
        assert!(channel >= 247, "white background drifted to {channel}");
    }
    Ok(())
}

#[tokio::test]
async fn test_identity_enhancement_matches_plain_output() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let plain = png_request(portrait(150, 200), "#FFFFFF");
    let enhanced = ProcessingRequest {
        enhance_options: Some(EnhanceOptions {
            skin_smooth: false,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            ..EnhanceOptions::default()
        }),
        ..plain.clone()
    };

    let plain = processor.process_to_response(&plain).await;
    let enhanced = processor.process_to_response(&enhanced).await;
    assert!(plain.success && enhanced.success);

    let plain = decode_output(&plain.image_data.unwrap()).into_rgba8();
    let enhanced = decode_output(&enhanced.image_data.unwrap()).into_rgba8();
    assert_eq!(plain, enhanced);
    Ok(())
}

#[tokio::test]
async fn test_default_enhancement_changes_output() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let plain = png_request(portrait(150, 200), "#FFFFFF");
    let enhanced = ProcessingRequest {
        enhance_options: Some(EnhanceOptions::default()),
        ..plain.clone()
    };

    let plain = processor.process_to_response(&plain).await;
    let enhanced = processor.process_to_response(&enhanced).await;
    assert!(plain.success && enhanced.success);
    assert_ne!(plain.image_data, enhanced.image_data);
    Ok(())
}

#[tokio::test]
async fn test_total_segmentation_failure_keeps_original() -> Result<()> {
    let (processor, _models) = processor(false)?;
    let request = ProcessingRequest {
        width: 100,
        height: 100,
        ..png_request(RgbImage::from_pixel(200, 200, Rgb([255, 0, 0])), "#00FF00")
    };

    match processor.process(&request).await {
        ProcessingResult::Success(output) => {
            assert_eq!(output.tier, SegmentationTier::OpaquePassthrough);
            assert!(!output.used_acceleration);
            let image = ImageIOService::load_from_bytes(&output.bytes)?.into_rgba8();
            let [r, g, b, a] = image.get_pixel(50, 50).0;
            assert!(r >= 253 && g <= 2 && b <= 2 && a == 255);
        },
        ProcessingResult::Failure(e) => panic!("passthrough must not fail: {e}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_json_round_trip() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let json = format!(
        r##"{{"imageData": "{}", "backgroundColor": "#FF0000", "width": 64, "height": 80, "format": "PNG", "useGPU": true}}"##,
        encode_payload(portrait(64, 80))
    );

    let response = processor.handle_json(&json).await.to_json();
    let response: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["width"], 64);
    assert_eq!(response["height"], 80);
    assert_eq!(response["usedGPU"], false);
    assert!(response["fileSize"].as_u64().unwrap() > 0);
    assert!(response.get("error").is_none());
    Ok(())
}

#[tokio::test]
async fn test_standalone_enhancement_request() -> Result<()> {
    let (processor, _models) = processor(true)?;
    let json = format!(
        r#"{{"imageData": "{}", "enhanceOptions": {{"method": "local"}}}}"#,
        encode_payload(portrait(40, 50))
    );

    let response = processor.handle_enhance_json(&json).await;
    assert!(response.success);
    let data_url = response.image_data.unwrap();
    assert!(data_url.starts_with("data:image/jpeg;base64,"));
    assert_eq!(decode_output(&data_url).dimensions(), (40, 50));

    let features = response.features_used.unwrap();
    assert_eq!(features.enhancement, "basic");
    assert_eq!(features.clothing_change, "none");
    Ok(())
}
