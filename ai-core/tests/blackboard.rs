use ai_core::{BbKey, Blackboard, BlackboardError};

#[test]
fn blackboard_set_get_remove_roundtrip() {
    let k_u32 = BbKey::<u32>::new(1);
    let k_str = BbKey::<String>::named("Greeting");

    let mut bb = Blackboard::new();
    assert!(!bb.contains(k_u32));

    bb.set(k_u32, 123);
    bb.set(k_str, "hello".to_string());

    assert_eq!(bb.get(k_u32).copied(), Some(123));
    assert_eq!(bb.get(k_str).map(|s| s.as_str()), Some("hello"));
    assert_eq!(bb.len(), 2);

    assert_eq!(bb.remove(k_u32), Some(123));
    assert_eq!(bb.get(k_u32), None);
}

#[test]
fn named_keys_ignore_case() {
    let mut bb = Blackboard::new();
    bb.set(BbKey::<i32>::named("Ammo"), 7);
    assert_eq!(bb.get(BbKey::<i32>::named("AMMO")).copied(), Some(7));
}

#[test]
fn try_get_reports_type_mismatch() {
    let mut bb = Blackboard::new();
    bb.set(BbKey::<u32>::new(9), 1u32);
    assert_eq!(
        bb.try_get(BbKey::<i32>::new(9)),
        Err(BlackboardError::TypeMismatch(9))
    );
    assert_eq!(bb.try_get(BbKey::<i32>::new(10)), Ok(None));
}

#[test]
fn get_or_default_mut_inserts_once() {
    let mut bb = Blackboard::new();
    let key = BbKey::<Vec<u8>>::new(3);
    bb.get_or_default_mut(key).push(1);
    bb.get_or_default_mut(key).push(2);
    assert_eq!(bb.get(key).map(Vec::as_slice), Some(&[1u8, 2][..]));
}

#[test]
#[should_panic(expected = "blackboard type mismatch")]
fn blackboard_type_mismatch_panics() {
    let mut bb = Blackboard::new();
    bb.set(BbKey::<u32>::new(1), 1u32);
    let _ = bb.get(BbKey::<i32>::new(1));
}
