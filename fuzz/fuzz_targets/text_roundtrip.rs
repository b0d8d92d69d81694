#![no_main]
use libfuzzer_sys::fuzz_target;

use seminal::Module;

fuzz_target!(|text: &str| {
    let _ = env_logger::try_init();
    let module = match Module::from_text(text) {
        Ok(module) => module,
        Err(_) => return,
    };
    let printed = module.display().to_string();
    log::debug!("printed:\n{}", printed);
    let reparsed = Module::from_text(&printed).unwrap();
    assert_eq!(printed, reparsed.display().to_string());
});
