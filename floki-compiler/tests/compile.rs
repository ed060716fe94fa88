use std::fs;

use floki_compiler::{compile, load_sensor_manifest, CompileError, CompileOptions, LintKind};
use fuf_contract::{decode_records, verify_checksum, ChecksumLayout, FufHeader, Record, RecordKind};

const BEHAVIOR: &str = r#"
# posture
state "stand_up"(strength=1.0)
state "lie_down"
state crouch(depth=0.4, hold=2s)

// locomotion
gait "walk"
gait trot

event imu_pitch > 20 -> "stand_up"
event imu_roll < -15 -> lie_down
event foot_contact_l == 0 -> crouch -> trot
event "stand_up" -> "walk"
event bumper -> dance
"#;

const MANIFEST: &str = r#"
robot: floki
sensors:
  - name: imu_pitch
    bus: i2c
  - name: imu_roll
    bus: i2c
  - foot_contact_l
  - name: bumper
"#;

#[test]
fn compiles_manifest_and_source_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("robot.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let sensors = load_sensor_manifest(&manifest_path).unwrap();
    assert_eq!(sensors, vec!["imu_pitch", "imu_roll", "foot_contact_l", "bumper"]);

    let out = compile(&sensors, BEHAVIOR, &CompileOptions::default()).unwrap();
    let header = FufHeader::from_bytes(&out.bytecode).unwrap();
    assert_eq!(header.sensor_count, 4);
    assert_eq!(header.state_count, 3);
    assert_eq!(header.gait_count, 2);
    assert_eq!(header.event_count, 4);

    let records = decode_records(&out.bytecode).unwrap();
    let events: Vec<_> = records
        .iter()
        .filter_map(|r| match r {
            Record::Event {
                id,
                sensor_id,
                state_id,
            } => Some((*id, *sensor_id, *state_id)),
            _ => None,
        })
        .collect();
    assert_eq!(
        events,
        vec![
            (0x30, 1, 0x10),
            (0x31, 2, 0x11),
            (0x32, 3, 0x12),
            (0x33, 4, 0x00),
        ]
    );

    let kinds: Vec<_> = out.diagnostics.iter().map(|d| (d.kind, d.line)).collect();
    assert_eq!(
        kinds,
        vec![
            (LintKind::NonSensorSource, Some(13)),
            (LintKind::NonSensorSource, Some(14)),
            (LintKind::UnresolvedTarget, Some(15)),
        ]
    );
}

#[test]
fn records_follow_source_order() {
    let out = compile(
        &["imu_pitch", "imu_roll", "foot_contact_l", "bumper"],
        BEHAVIOR,
        &CompileOptions::default(),
    )
    .unwrap();
    let kinds: Vec<_> = decode_records(&out.bytecode)
        .unwrap()
        .iter()
        .map(Record::kind)
        .collect();
    let mut expected = vec![RecordKind::Sensor; 4];
    expected.extend([RecordKind::State; 3]);
    expected.extend([RecordKind::Gait; 2]);
    expected.extend([RecordKind::Event; 4]);
    assert_eq!(kinds, expected);
}

#[test]
fn every_layout_verifies() {
    for layout in [ChecksumLayout::Corrected, ChecksumLayout::Legacy] {
        let options = CompileOptions {
            checksum: layout,
            ..CompileOptions::default()
        };
        let out = compile(&["imu_pitch", "imu_roll", "foot_contact_l", "bumper"], BEHAVIOR, &options)
            .unwrap();
        assert_eq!(out.layout, layout);
        assert_eq!(verify_checksum(&out.bytecode, layout), Ok(out.checksum));
        assert!(out.checksum <= 0xFF);
    }
}

const GOLDEN_SOURCE: &str = "state stand_up(strength=1.0)
state lie_down
gait walk
event imu_pitch -> stand_up
event bumper -> lie_down -> walk
event bumper -> nowhere
";

const GOLDEN_RECORDS: &str = "01696d755f7069746368000262756d70657200\
107374616e645f757000737472656e6774683d312e3000116c69655f646f776e00002077616c6b00\
300110310211320200";

fn golden_image(layout: ChecksumLayout) -> String {
    let options = CompileOptions {
        checksum: layout,
        ..CompileOptions::default()
    };
    let out = compile(&["imu_pitch", "bumper"], GOLDEN_SOURCE, &options).unwrap();
    assert_eq!(out.checksum, 0xce);
    hex::encode(&out.bytecode)
}

#[test]
fn legacy_image_matches_earlier_compilers_byte_for_byte() {
    let expected = format!("4655460000010000ce000000010003000200000100000000{GOLDEN_RECORDS}");
    assert_eq!(golden_image(ChecksumLayout::Legacy), expected);
}

#[test]
fn corrected_image_is_pinned() {
    let expected = format!("465546000001ce0000000200010003000200000100000000{GOLDEN_RECORDS}");
    assert_eq!(golden_image(ChecksumLayout::Corrected), expected);
}

#[test]
fn tampered_image_fails_verification() {
    let out = compile(&["imu_pitch"], "state a\nevent imu_pitch -> a\n", &CompileOptions::default())
        .unwrap();
    let mut image = out.bytecode.clone();
    let last = image.len() - 1;
    image[last] ^= 0x01;
    assert!(verify_checksum(&image, ChecksumLayout::Corrected).is_err());
}

#[test]
fn errors_carry_the_offending_line() {
    let source = "state idle\ngait walk\nevent\n";
    let err = compile(&["imu"], source, &CompileOptions::default()).unwrap_err();
    match err {
        CompileError::Syntax { line, content, .. } => {
            assert_eq!(line, 3);
            assert_eq!(content, "event");
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn manifest_formats_agree() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("robot.yml");
    let toml = dir.path().join("robot.toml");
    let json = dir.path().join("robot.json");
    fs::write(&yaml, "sensors:\n  - a\n  - name: b\n").unwrap();
    fs::write(&toml, "sensors = [\"a\", { name = \"b\" }]\n").unwrap();
    fs::write(&json, r#"{"sensors": [{"name": "a"}, "b"]}"#).unwrap();

    for path in [yaml, toml, json] {
        assert_eq!(load_sensor_manifest(&path).unwrap(), vec!["a", "b"], "{}", path.display());
    }
}

#[test]
fn duplicate_manifest_entry_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("robot.yaml");
    fs::write(&path, "sensors:\n  - imu\n  - name: imu\n").unwrap();
    let sensors = load_sensor_manifest(&path).unwrap();
    let err = compile(&sensors, "", &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Configuration(_)));
}
