use crate::euler::xyzrpw_2_pose;
use crate::fanuc_tp::FanucTp;
use crate::motoman_inform::MotomanInform;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{RobotPost, Target};
use crate::tests::test_utils::contents;

fn joints(i: usize) -> Target {
    Target::from_joints(vec![i as f64, -20.0, 40.0, 0.0, 70.0, 0.0])
}

fn cartesian(i: usize) -> Target {
    Target::from_pose(xyzrpw_2_pose(&[500.0 + 10.0 * i as f64, 0.0, 400.0, 180.0, 0.0, 180.0]))
}

#[test]
fn test_fanuc_pages_repeat_frame_selection() {
    let mut post = FanucTp::new(&PostSettings { max_lines: Some(4), ..Default::default() });
    post.prog_start("long").unwrap();
    post.set_frame(&xyzrpw_2_pose(&[0.0, 500.0, 0.0, 0.0, 0.0, 0.0]), Some(2), "Fixture").unwrap();
    for i in 0..10 {
        post.move_j(&joints(i)).unwrap();
    }
    post.prog_finish("long").unwrap();

    let files = post.program_files("long").unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["LONG.LS", "LONG_1.LS", "LONG_2.LS", "LONG_3.LS", "LONG_4.LS"]);

    let caller = contents(&files, "LONG.LS");
    assert!(caller.contains("   1:  CALL LONG_1 ;\n   2:  CALL LONG_2 ;\n   3:  CALL LONG_3 ;\n   4:  CALL LONG_4 ;\n"));
    assert!(caller.contains("DEFAULT_GROUP\t= *,*,*,*,*;"));

    let first = contents(&files, "LONG_1.LS");
    assert!(first.contains("/PROG  LONG_1\n"));
    assert!(first.contains("   1:  !UF2 Fixture ;\n   2:  UFRAME_NUM=2 ;\n   3:  J P[1] "));
    assert!(first.contains("LINE_COUNT\t= 4;"));

    // Every later page selects the frame again and numbers its targets from 1
    let second = contents(&files, "LONG_2.LS");
    assert!(second.contains("   1:  UFRAME_NUM=2 ;\n   2:  J P[1] "));
    assert!(second.contains("   4:  J P[3] "));
    assert!(second.contains("P[3]{"));
    assert!(!second.contains("P[4]{"));
    assert!(second.contains("\tUF : 2, UT : 1,\n"));

    let last = contents(&files, "LONG_4.LS");
    assert!(last.contains("LINE_COUNT\t= 3;"));
}

#[test]
fn test_fanuc_page_names_are_reserved() {
    let mut post = FanucTp::new(&PostSettings { max_lines: Some(2), ..Default::default() });
    post.prog_start("long").unwrap();
    for i in 0..5 {
        post.move_l(&cartesian(i)).unwrap();
    }
    post.prog_finish("long").unwrap();

    assert!(matches!(post.prog_start("long_2"), Err(PostError::AlreadySplit { .. })));
    assert!(matches!(post.prog_start("LONG"), Err(PostError::AlreadySplit { .. })));
    post.prog_start("other").unwrap();
}

#[test]
fn test_fanuc_program_at_the_limit_is_not_split() {
    let mut post = FanucTp::new(&PostSettings { max_lines: Some(3), ..Default::default() });
    post.prog_start("fits").unwrap();
    for i in 0..3 {
        post.move_l(&cartesian(i)).unwrap();
    }
    post.prog_finish("fits").unwrap();

    let files = post.program_files("fits").unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].contents.contains("LINE_COUNT\t= 3;"));
}

#[test]
fn test_motoman_pages_and_circular_moves() {
    let settings = PostSettings {
        max_lines: Some(2),
        pulses_per_degree: Some(vec![1000.0, 1000.0, 1000.0, 500.0, 500.0, 250.0]),
        ..Default::default()
    };
    let mut post = MotomanInform::new(&settings);
    post.prog_start("job").unwrap();
    post.move_j(&joints(0)).unwrap();
    post.move_l(&cartesian(1)).unwrap();
    // Does not fit on the first page, its start point is defined again on the next one
    post.move_c(&cartesian(2), &cartesian(3)).unwrap();
    post.prog_finish("job").unwrap();

    let files = post.program_files("job").unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["JOB.JBI", "JOB_1.JBI", "JOB_2.JBI"]);

    let caller = contents(&files, "JOB.JBI");
    assert!(caller.contains("///NPOS 0,0,0,0,0,0\n"));
    assert!(caller.contains("NOP\nCALL JOB:JOB_1\nCALL JOB:JOB_2\nEND\n"));

    let first = contents(&files, "JOB_1.JBI");
    assert!(first.contains("///POSTYPE PULSE\n///PULSE\nC00000=0,-20000,40000,0,35000,0\n"));
    assert!(first.contains("MOVJ C00000 "));
    assert!(first.contains("MOVL C00001 "));

    let second = contents(&files, "JOB_2.JBI");
    assert!(second.contains("///NPOS 3,0,0,0,0,0\n"));
    assert!(second.contains("MOVC C00000 "));
    assert!(second.contains("MOVC C00002 "));
    assert!(second.contains("C00000=510.000,"));
}

#[test]
fn test_motoman_joint_target_without_pulses() {
    let mut post = MotomanInform::new(&PostSettings::default());
    post.prog_start("job").unwrap();
    assert!(matches!(post.move_j(&joints(0)), Err(PostError::Unsupported { .. })));
    assert!(matches!(post.move_c(&cartesian(0), &cartesian(1)), Err(PostError::Unsupported { .. })));
}
