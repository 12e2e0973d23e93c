use ledger_enroll::{LedgerSolana, TransportType};

fn main() {
    #[cfg(feature = "hid")]
    {
        let ledger = LedgerSolana::new(&TransportType::NativeHID).unwrap_or_else(|e| {
            eprintln!("failed to connect: {e}");
            std::process::exit(1);
        });
        let config = ledger.get_app_config().expect("failed to get app configuration");
        println!("{config}");
    }
    #[cfg(not(feature = "hid"))]
    {
        eprintln!("enable the 'hid' feature to use USB transport");
    }
}
