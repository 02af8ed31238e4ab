//! Operator input types as seen by downstream crates.

use comms_if::tc::{
    input::{OperatorInput, Trigger},
    Tc,
};

#[test]
fn test_input_module_is_public() {
    let tc = Tc::from_json(r#"{"type": "INPUT", "payload": {"buttons": {"x": true}, "pov_deg": 90}}"#);

    match tc {
        Ok(Tc::Input(input)) => {
            let input: OperatorInput = input;
            assert!(input.is_active(Trigger::X));
            assert!(input.is_active(Trigger::Pov(90)));
            assert!(!input.is_active(Trigger::Pov(270)));
        }
        other => panic!("Expected an input TC, got {:?}", other),
    }
}
