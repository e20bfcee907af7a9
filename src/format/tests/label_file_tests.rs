//! Tests for loading and saving whole label documents.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};

use super::{PNG_MAGIC, png_bytes};
use crate::format::label_file::build_document;
use crate::format::{FormatError, LabelFile, LabelFileError, SavePayload, VERSION};
use crate::model::{Annotation, Color, Shape, ShapeType};

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// A legacy-schema document embedding a 4x3 PNG.
fn legacy_document() -> Value {
    json!({
        "version": "3.16.7",
        "flags": {"occluded": true},
        "shapes": [{
            "label": "cat",
            "points": [[0, 0], [1, 0], [1, 1]],
            "shape_type": "polygon",
            "line_color": null,
            "fill_color": null
        }],
        "lineColor": [0, 255, 0, 128],
        "fillColor": [255, 0, 0, 128],
        "imagePath": "cat.png",
        "imageData": BASE64.encode(png_bytes(4, 3)),
        "imageHeight": 3,
        "imageWidth": 4
    })
}

#[test]
fn test_load_legacy_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.json");
    write_json(&path, &legacy_document());

    let label_file = LabelFile::open(&path).unwrap();

    assert_eq!(label_file.annotations.len(), 1);
    let annotation = &label_file.annotations[0];
    assert_eq!(annotation.name, "cat");
    assert_eq!(annotation.shapes.len(), 1);
    assert_eq!(annotation.shapes[0].shape_type, ShapeType::Polygon);
    assert_eq!(annotation.shapes[0].points.len(), 3);
    assert!(annotation.shapes[0].is_closed());

    assert_eq!(label_file.filename.as_deref(), Some(path.as_path()));
    assert_eq!(label_file.image_path.as_deref(), Some("cat.png"));
    assert_eq!(label_file.image_data.as_deref(), Some(png_bytes(4, 3).as_slice()));
    assert_eq!(label_file.line_color, Some(Color::rgba(0, 255, 0, 128)));
    assert_eq!(label_file.fill_color, Some(Color::rgba(255, 0, 0, 128)));
    assert_eq!(label_file.flags.get("occluded"), Some(&true));
    assert_eq!((label_file.image_height, label_file.image_width), (Some(3), Some(4)));
}

#[test]
fn test_load_annotation_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car.json");
    let mut document = legacy_document();
    let object = document.as_object_mut().unwrap();
    object.remove("shapes");
    object.insert(
        "annotations".to_string(),
        json!([{
            "name": "car",
            "type": "label",
            "shapes": [{"type": "rectangle", "points": [[0, 0], [3, 2]]}],
            "attributes": {"make": "Ford"},
            "children": [{"name": "wheel"}]
        }]),
    );
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    assert_eq!(label_file.annotations.len(), 1);
    let car = &label_file.annotations[0];
    assert_eq!(car.shapes[0].shape_type, ShapeType::Rectangle);
    assert_eq!(car.attributes["make"], "Ford");
    assert_eq!(car.children, vec![Annotation::new("wheel")]);
    let keys: Vec<&str> = label_file.other_data.keys().map(String::as_str).collect();
    assert_eq!(keys, ["version"]);
}

#[test]
fn test_unrecognized_fields_go_to_other_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.json");
    let mut document = legacy_document();
    document["custom"] = json!({"nested": [1, 2, 3]});
    document["reviewer"] = json!("ana");
    document["labels"] = json!(["cat", "dog"]);
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    let keys: Vec<&str> = label_file.other_data.keys().map(String::as_str).collect();
    assert_eq!(keys, ["version", "shapes", "custom", "reviewer"]);
    assert_eq!(label_file.other_data["custom"], json!({"nested": [1, 2, 3]}));
}

#[test]
fn test_legacy_version_and_shapes_kept_in_other_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.json");
    let document = legacy_document();
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    assert_eq!(label_file.other_data.get("version"), Some(&json!("3.16.7")));
    assert_eq!(label_file.other_data.get("shapes"), Some(&document["shapes"]));
    // Still migrated into annotations
    assert_eq!(label_file.annotations[0].name, "cat");
}

#[test]
fn test_image_path_resolved_relative_to_label_file() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir(&images).unwrap();
    std::fs::write(images.join("cat.png"), png_bytes(6, 2)).unwrap();

    let mut document = legacy_document();
    document["imageData"] = Value::Null;
    document["imagePath"] = json!("images/cat.png");
    document["imageHeight"] = json!(2);
    document["imageWidth"] = json!(6);
    let path = dir.path().join("cat.json");
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    let image_data = label_file.image_data.unwrap();
    assert!(image_data.starts_with(&PNG_MAGIC));
    assert_eq!((label_file.image_height, label_file.image_width), (Some(2), Some(6)));
}

#[test]
fn test_missing_referenced_image_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut document = legacy_document();
    document["imageData"] = Value::Null;
    document["imagePath"] = json!("gone.png");
    document["imageHeight"] = json!(480);
    let path = dir.path().join("cat.json");
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    assert!(label_file.image_data.is_none());
    assert_eq!(label_file.image_height, Some(480));
    assert_eq!(label_file.annotations.len(), 1);
}

#[test]
fn test_integral_float_dimensions_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let mut document = legacy_document();
    document["imageHeight"] = json!(3.0);
    document["imageWidth"] = json!(4.0);
    let path = dir.path().join("cat.json");
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    assert_eq!((label_file.image_height, label_file.image_width), (Some(3), Some(4)));
}

#[test]
fn test_fractional_dimension_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for bad in [json!(3.5), json!(-3), json!("3")] {
        let mut document = legacy_document();
        document["imageHeight"] = bad;
        let path = dir.path().join("cat.json");
        write_json(&path, &document);

        let err = LabelFile::open(&path).unwrap_err();
        assert!(matches!(err.cause(), FormatError::InvalidFormat { .. }));
    }
}

#[test]
fn test_load_corrects_declared_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let mut document = legacy_document();
    document["imageHeight"] = json!(1000);
    document["imageWidth"] = json!(2000);
    let path = dir.path().join("cat.json");
    write_json(&path, &document);

    let label_file = LabelFile::open(&path).unwrap();
    assert_eq!((label_file.image_height, label_file.image_width), (Some(3), Some(4)));
}

#[test]
fn test_missing_required_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut document = legacy_document();
    document.as_object_mut().unwrap().remove("lineColor");
    let path = dir.path().join("cat.json");
    write_json(&path, &document);

    let err = LabelFile::open(&path).unwrap_err();
    assert!(matches!(
        err.cause(),
        FormatError::MissingField { field } if field == "lineColor"
    ));
}

#[test]
fn test_failed_load_leaves_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    write_json(&good, &legacy_document());
    let mut label_file = LabelFile::open(&good).unwrap();

    // Parses, but the embedded image is garbage
    let mut broken = legacy_document();
    broken["imageData"] = json!(BASE64.encode(b"not an image"));
    broken["shapes"] = json!([]);
    broken["extra"] = json!(1);
    let bad = dir.path().join("bad.json");
    write_json(&bad, &broken);

    let err = label_file.load(&bad).unwrap_err();
    assert!(matches!(err, LabelFileError::Load { ref path, .. } if path == &bad));
    assert_eq!(label_file.filename.as_deref(), Some(good.as_path()));
    assert_eq!(label_file.annotations.len(), 1);
    assert!(!label_file.other_data.contains_key("extra"));
    assert_eq!(label_file.other_data["shapes"], legacy_document()["shapes"]);

    std::fs::write(&bad, "{ not json").unwrap();
    let err = label_file.load(&bad).unwrap_err();
    assert!(matches!(err.cause(), FormatError::Json(_)));
    assert_eq!(label_file.filename.as_deref(), Some(good.as_path()));
}

#[test]
fn test_roundtrip_preserves_other_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");

    let shapes = vec![Annotation::new("cat")];
    let mut other_data = Map::new();
    other_data.insert("custom".to_string(), json!("v"));
    let image = png_bytes(4, 3);

    let mut label_file = LabelFile::new();
    let payload = SavePayload::new(&shapes, "cat.png", Some(3), Some(4))
        .image_data(Some(&image))
        .other_data(&other_data);
    label_file.save(&path, &payload).unwrap();
    assert_eq!(label_file.filename.as_deref(), Some(path.as_path()));

    let loaded = LabelFile::open(&path).unwrap();
    assert_eq!(loaded.other_data.get("custom"), Some(&json!("v")));
    assert_eq!(loaded.annotations.len(), 1);
    assert_eq!(loaded.annotations[0].name, "cat");
    assert_eq!(loaded.image_data.as_deref(), Some(image.as_slice()));
    assert!(loaded.flags.is_empty());
}

/// A two-level tree with a non-default type and attributes.
fn annotation_tree() -> Vec<Annotation> {
    let mut body = Shape::new(ShapeType::Rectangle).with_line_color(Some(Color::rgb(1, 2, 3)));
    body.add_point((0.0, 0.0));
    body.add_point((3.0, 2.0));
    body.close();

    let mut wheel = Shape::new(ShapeType::Circle);
    wheel.add_point((1.0, 1.0));
    wheel.add_point((1.5, 1.0));
    wheel.close();

    let mut car = Annotation::new("car")
        .with_shape(body)
        .with_child(Annotation::new("wheel").with_shape(wheel));
    car.kind = "guide".to_string();
    car.attributes.insert("make".to_string(), json!("Ford"));
    car.attributes.insert("doors".to_string(), json!(4));
    vec![car, Annotation::new("empty")]
}

#[test]
fn test_save_document_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");

    let mut shape = Shape::new(ShapeType::Linestrip).with_fill_color(Some(Color::rgb(9, 8, 7)));
    shape.add_point((1.5, 2.5));
    shape.add_point((3.0, 4.0));
    shape.close();

    let mut label_file = LabelFile::new();
    label_file.image_path = Some("doc.png".to_string());
    label_file.image_data = Some(png_bytes(2, 2));
    label_file.annotations = vec![Annotation::new("road").with_shape(shape.clone())];
    label_file.flags.insert("night".to_string(), false);
    label_file.save_document(&path, false).unwrap();

    let loaded = LabelFile::open(&path).unwrap();
    assert_eq!(loaded.annotations, vec![Annotation::new("road").with_shape(shape)]);
    assert_eq!(loaded.flags.get("night"), Some(&false));
    // Image was not embedded and doc.png does not exist
    assert!(loaded.image_data.is_none());
}

#[test]
fn test_save_document_keeps_annotation_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car.json");

    let mut label_file = LabelFile::new();
    label_file.image_path = Some("car.png".to_string());
    label_file.image_data = Some(png_bytes(4, 3));
    label_file.annotations = annotation_tree();
    label_file.save_document(&path, true).unwrap();

    let loaded = LabelFile::open(&path).unwrap();
    assert_eq!(loaded.annotations, annotation_tree());
    assert_eq!(loaded.annotations[0].kind, "guide");
    assert_eq!(loaded.annotations[0].attributes["make"], "Ford");
    assert_eq!(loaded.annotations[0].children[0].shapes[0].shape_type, ShapeType::Circle);
}

#[test]
fn test_save_document_after_legacy_load_writes_current_annotations() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join("cat.json");
    write_json(&legacy, &legacy_document());

    let mut label_file = LabelFile::open(&legacy).unwrap();
    label_file.annotations = annotation_tree();
    let resaved = dir.path().join("resaved.json");
    label_file.save_document(&resaved, true).unwrap();

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&resaved).unwrap()).unwrap();
    assert_eq!(written["version"], VERSION);
    assert_eq!(written["shapes"][0]["name"], "car");

    let loaded = LabelFile::open(&resaved).unwrap();
    assert_eq!(loaded.annotations, annotation_tree());
}

#[test]
fn test_save_layout() {
    let shapes = vec![Annotation::new("chat noir")];
    let image = png_bytes(4, 3);
    let payload = SavePayload::new(&shapes, "image.png", Some(30), Some(4))
        .image_data(Some(&image))
        .line_color(Some(Color::rgb(0, 255, 0)));

    let document = build_document(&payload).unwrap();
    let keys: Vec<&str> = document.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "version",
            "flags",
            "shapes",
            "lineColor",
            "fillColor",
            "imagePath",
            "imageData",
            "imageHeight",
            "imageWidth"
        ]
    );
    assert_eq!(document["version"], VERSION);
    assert_eq!(document["flags"], json!({}));
    assert_eq!(document["lineColor"], json!([0, 255, 0, 255]));
    assert_eq!(document["fillColor"], Value::Null);
    assert_eq!(document["shapes"][0]["name"], "chat noir");
    assert_eq!(document["shapes"][0]["type"], "label");
    assert_eq!(document["imageData"], json!(BASE64.encode(&image)));
    // Declared height corrected from the embedded image
    assert_eq!(document["imageHeight"], json!(3));
    assert_eq!(document["imageWidth"], json!(4));
}

#[test]
fn test_save_without_image_keeps_declared_dimensions() {
    let shapes: Vec<Annotation> = Vec::new();
    let payload = SavePayload::new(&shapes, "image.png", Some(30), None);
    let document = build_document(&payload).unwrap();
    assert_eq!(document["imageData"], Value::Null);
    assert_eq!(document["imageHeight"], json!(30));
    assert_eq!(document["imageWidth"], Value::Null);
}

#[test]
fn test_other_data_overrides_standard_keys() {
    let shapes: Vec<Annotation> = Vec::new();
    let mut other_data = Map::new();
    other_data.insert("imageHeight".to_string(), json!(999));
    other_data.insert("extra".to_string(), json!(true));

    let payload = SavePayload::new(&shapes, "image.png", Some(3), Some(4)).other_data(&other_data);
    let document = build_document(&payload).unwrap();
    assert_eq!(document["imageHeight"], json!(999));
    assert_eq!(document["extra"], json!(true));
    assert_eq!(document.keys().last().map(String::as_str), Some("extra"));
}

#[test]
fn test_save_preserves_non_ascii() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let shapes = vec![Annotation::new("猫")];

    LabelFile::new()
        .save(&path, &SavePayload::new(&shapes, "画像.png", None, None))
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"猫\""));
    assert!(text.contains("画像.png"));
    assert!(text.contains("\n  \"version\""));
}

#[test]
fn test_failed_save_keeps_filename() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("missing_dir").join("bad.json");
    let shapes: Vec<Annotation> = Vec::new();
    let payload = SavePayload::new(&shapes, "image.png", None, None);

    let mut label_file = LabelFile::new();
    label_file.save(&good, &payload).unwrap();

    let err = label_file.save(&bad, &payload).unwrap_err();
    assert!(matches!(err, LabelFileError::Save { .. }));
    assert!(matches!(err.cause(), FormatError::Io(_)));
    assert_eq!(label_file.filename.as_deref(), Some(good.as_path()));
}

#[test]
fn test_is_label_file() {
    assert!(LabelFile::is_label_file("a/b/image.json"));
    assert!(LabelFile::is_label_file("IMAGE.JSON"));
    assert!(LabelFile::is_label_file("image.Json"));
    assert!(!LabelFile::is_label_file("image.png"));
    assert!(!LabelFile::is_label_file("json"));
    assert!(!LabelFile::is_label_file("image.json.bak"));
}
