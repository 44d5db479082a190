//! Unit tests for image artifacts and their encodings

use vton_studio::artifact::{base64, upload::detect_image_mime, ImageArtifact};

const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[test]
fn test_base64_decode_data_url() {
    let data_url = "data:image/png;base64,SGVsbG8sIFdvcmxkIQ==";
    let decoded = base64::decode(data_url).unwrap();

    assert_eq!(b"Hello, World!", decoded.as_slice());
}

#[test]
fn test_base64_decode_rejects_garbage() {
    assert!(base64::decode("not valid base64!!!").is_err());
    assert!(base64::decode("data:image/png;base64,@@@").is_err());
}

#[test]
fn test_parse_classifies_each_form() {
    assert!(ImageArtifact::parse("blob:abc.png").unwrap().is_ephemeral());
    assert!(ImageArtifact::parse("https://cdn.test/a.png").unwrap().is_remote());
    assert!(ImageArtifact::parse("http://cdn.test/a.png").unwrap().is_remote());
    assert!(ImageArtifact::parse("data:image/png;base64,AAAA").unwrap().is_embedded());

    assert!(ImageArtifact::parse("ftp://cdn.test/a.png").is_err());
    assert!(ImageArtifact::parse("").is_err());
}

#[test]
fn test_embed_is_self_contained() {
    let mut data = PNG_HEADER.to_vec();
    data.extend_from_slice(b"pixels");

    let artifact = ImageArtifact::embed(&data, "image/png");
    let wire = artifact.to_wire();

    assert!(wire.starts_with("data:image/png;base64,"));
    assert_eq!(artifact.bytes().unwrap().unwrap(), data);
    assert_eq!(ImageArtifact::parse(&wire).unwrap(), artifact);
}

#[test]
fn test_display_hides_payload() {
    let artifact = ImageArtifact::embed(b"secret bytes", "image/jpeg");
    let shown = artifact.to_string();

    assert!(shown.contains("image/jpeg"));
    assert!(!shown.contains(&base64::encode(b"secret bytes")));
}

#[test]
fn test_serde_uses_wire_form() {
    let artifact: ImageArtifact = serde_json::from_str("\"blob:abc.png\"").unwrap();
    assert_eq!(artifact, ImageArtifact::Ephemeral("blob:abc.png".to_string()));
    assert_eq!(serde_json::to_string(&artifact).unwrap(), "\"blob:abc.png\"");

    assert!(serde_json::from_str::<ImageArtifact>("\"nonsense\"").is_err());
}

#[test]
fn test_detect_image_mime() {
    let mut png = PNG_HEADER.to_vec();
    png.extend_from_slice(&[0; 8]);
    assert_eq!(detect_image_mime(&png), Some("image/png"));

    let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0];
    assert_eq!(detect_image_mime(&jpeg), Some("image/jpeg"));

    assert_eq!(detect_image_mime(b"plain text here"), None);
}
