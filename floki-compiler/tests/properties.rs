use floki_compiler::{compile, CompileOptions};
use fuf_contract::{decode_records, verify_checksum, ChecksumLayout, FufHeader, RecordKind};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Line {
    State(usize),
    Gait(usize),
    /// sensor index (possibly out of range), state index (possibly undeclared)
    Event(usize, usize),
    Blank,
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        (0usize..6).prop_map(Line::State),
        (0usize..6).prop_map(Line::Gait),
        (0usize..8, 0usize..8).prop_map(|(s, t)| Line::Event(s, t)),
        Just(Line::Blank),
    ]
}

/// Renders lines, dropping repeated state/gait names so every source is valid.
fn render(lines: &[Line], sensor_count: usize) -> String {
    let mut states = std::collections::HashSet::new();
    let mut gaits = std::collections::HashSet::new();
    let mut out = String::new();
    for line in lines {
        match line {
            Line::State(n) if states.insert(*n) => out.push_str(&format!("state st{n}(p={n})\n")),
            Line::Gait(n) if gaits.insert(*n) => out.push_str(&format!("gait \"g{n}\"\n")),
            Line::Event(s, t) => {
                let source = if *s < sensor_count {
                    format!("sensor{s}")
                } else {
                    format!("st{s}")
                };
                out.push_str(&format!("event {source} > 1 -> st{t}\n"));
            }
            Line::Blank => out.push_str("  # nothing here\n"),
            _ => {}
        }
    }
    out
}

proptest! {
    #[test]
    fn header_counts_match_records(
        sensor_count in 0usize..6,
        lines in prop::collection::vec(line_strategy(), 0..40),
    ) {
        let sensors: Vec<String> = (0..sensor_count).map(|i| format!("sensor{i}")).collect();
        let source = render(&lines, sensor_count);
        let out = compile(&sensors, &source, &CompileOptions::default()).unwrap();

        let header = FufHeader::from_bytes(&out.bytecode).unwrap();
        let records = decode_records(&out.bytecode).unwrap();
        let count = |kind: RecordKind| records.iter().filter(|r| r.kind() == kind).count() as u16;

        prop_assert_eq!(header.sensor_count, count(RecordKind::Sensor));
        prop_assert_eq!(header.state_count, count(RecordKind::State));
        prop_assert_eq!(header.gait_count, count(RecordKind::Gait));
        prop_assert_eq!(header.event_count, count(RecordKind::Event));
        prop_assert_eq!(
            (header.sensor_count + header.state_count + header.gait_count) as usize,
            out.program.symbol_count()
        );
        prop_assert!(verify_checksum(&out.bytecode, ChecksumLayout::Corrected).is_ok());
    }

    #[test]
    fn sensor_ids_are_sequential(names in prop::collection::btree_set("[a-z][a-z0-9_]{0,8}", 0..40)) {
        let names: Vec<String> = names.into_iter().collect();
        let out = compile(&names, "", &CompileOptions::default()).unwrap();
        for (index, sensor) in out.program.sensors.iter().enumerate() {
            prop_assert_eq!(sensor.id as usize, index + 1);
            prop_assert_eq!(&sensor.name, &names[index]);
        }
    }

    #[test]
    fn compilation_is_deterministic(
        sensor_count in 0usize..6,
        lines in prop::collection::vec(line_strategy(), 0..40),
        legacy in any::<bool>(),
    ) {
        let sensors: Vec<String> = (0..sensor_count).map(|i| format!("sensor{i}")).collect();
        let source = render(&lines, sensor_count);
        let options = CompileOptions {
            checksum: if legacy { ChecksumLayout::Legacy } else { ChecksumLayout::Corrected },
            ..CompileOptions::default()
        };
        let first = compile(&sensors, &source, &options).unwrap();
        let second = compile(&sensors, &source, &options).unwrap();
        prop_assert_eq!(&first.bytecode, &second.bytecode);
        prop_assert_eq!(first.checksum, second.checksum);
    }

    #[test]
    fn non_sensor_sources_emit_nothing(lines in prop::collection::vec(line_strategy(), 0..40)) {
        let source = render(&lines, 0);
        let out = compile(&[] as &[&str], &source, &CompileOptions::default()).unwrap();
        prop_assert!(out.program.events.is_empty());
    }
}
