use mill_analysis_imports::Stylesheet;
use mill_codemods::{migrate, migrate_contents};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

#[test]
fn test_legacy_entry_point() {
    let input = r#"@tailwind base;
@tailwind components;
@tailwind utilities;

@layer components {
  .btn {
    @apply !px-4 hover:!underline;
  }
}

.card > p {
  margin: 0;
}
"#;
    let expected = r#"@import "tailwindcss";
@utility btn {
  @apply px-4! hover:underline!;
}
@layer utilities {
  .card > p {
    margin: 0;
  }
}
"#;
    assert_eq!(migrate_contents(input).unwrap(), expected);
}

#[test]
fn test_untouched_sheet_is_byte_identical() {
    let input = "/* tokens */\n:root {\n  --brand: #f00;\n}\n\n.a { @apply flex; }\n";
    assert_eq!(migrate_contents(input).unwrap(), input);
}

#[test]
fn test_sheet_imported_into_utilities_layer() {
    let mut sheet = Stylesheet::parse(
        ".tab-4 {\n  tab-size: 4;\n}\nh1 {\n  font-size: 2rem;\n}\n",
        Some(PathBuf::from("/p/b.css")),
    )
    .unwrap();
    sheet.layers.push("utilities".to_string());

    let runs = migrate(&mut sheet).unwrap();
    let changes: Vec<(&str, usize)> = runs.iter().map(|run| (run.codemod, run.changes)).collect();
    assert_eq!(
        changes,
        vec![
            ("migrate-at-apply", 0),
            ("migrate-at-layer-utilities", 1),
            ("migrate-missing-layers", 0),
            ("migrate-tailwind-directives", 0),
            ("format-nodes", 1),
        ]
    );
    assert_eq!(
        sheet.content(),
        "@utility tab-4 {\n  tab-size: 4;\n}\nh1 {\n  font-size: 2rem;\n}\n"
    );
}
