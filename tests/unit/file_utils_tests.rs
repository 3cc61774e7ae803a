/*!
 * Tests for file and directory utilities
 */

use anyhow::Result;
use std::fs;

use cadtranslator::file_utils::{FileManager, FileType};

use crate::common;

#[test]
fn test_generate_output_path_shouldAppendTargetSuffix() {
    let path = FileManager::generate_output_path("/drawings/plan.v2.dwg", "/out", "DE", "dwg");
    assert_eq!(path, std::path::PathBuf::from("/out/plan.v2_DE.dwg"));
}

#[test]
fn test_find_drawings_shouldSkipOutputFolderAndOtherFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "b.DWG", "x")?;
    common::create_test_file(root, "a.dxf", "x")?;
    common::create_test_file(root, "notes.txt", "x")?;
    common::create_test_file(root, "sub/c.dwg", "x")?;
    common::create_test_file(root, "output/a_DE.dxf", "x")?;

    let found = FileManager::find_drawings(root, Some(&root.join("output")))?;

    let names: Vec<String> = found
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["a.dxf", "b.DWG", "sub/c.dwg"]);
    Ok(())
}

#[test]
fn test_detect_file_type_withExtensionsAndContent_shouldClassify() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();

    let dwg = common::create_test_file(root, "plan.dwg", "")?;
    let dxf_content = common::create_test_file(root, "plan.export", "  0\nSECTION\n  2\nHEADER\n")?;
    let dwg_content = common::create_test_file(root, "plan.bin", "AC1032 rest of file")?;
    let other = common::create_test_file(root, "readme.txt", "hello")?;

    assert_eq!(FileManager::detect_file_type(&dwg)?, FileType::Dwg);
    assert_eq!(FileManager::detect_file_type(&dxf_content)?, FileType::Dxf);
    assert_eq!(FileManager::detect_file_type(&dwg_content)?, FileType::Dwg);
    assert_eq!(FileManager::detect_file_type(&other)?, FileType::Unknown);
    assert!(FileManager::detect_file_type(root.join("missing.dwg")).is_err());
    Ok(())
}

#[test]
fn test_move_file_withExistingTarget_shouldReplaceIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let from = common::create_test_file(temp_dir.path(), "work/plan_DE.dwg", "new")?;
    let to = common::create_test_file(temp_dir.path(), "out/plan_DE.dwg", "old")?;

    FileManager::move_file(&from, &to)?;

    assert!(!from.exists());
    assert_eq!(fs::read_to_string(&to)?, "new");
    Ok(())
}

#[test]
fn test_write_to_file_thenAppendLog_shouldCreateParents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let report = temp_dir.path().join("a/b/report.log");
    let issues = temp_dir.path().join("c/issues.log");

    FileManager::write_to_file(&report, "header\n")?;
    FileManager::append_to_log_file(&issues, "first")?;
    FileManager::append_to_log_file(&issues, "second")?;

    assert_eq!(fs::read_to_string(&report)?, "header\n");
    let log = fs::read_to_string(&issues)?;
    assert_eq!(log.lines().count(), 2);
    assert!(log.lines().all(|l| l.starts_with('[')));
    assert!(log.ends_with("second\n"));
    Ok(())
}

#[test]
fn test_copy_file_withMissingSource_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    assert!(FileManager::copy_file(temp_dir.path().join("none.dwg"), temp_dir.path().join("x.dwg")).is_err());
    Ok(())
}
