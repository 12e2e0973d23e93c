use ledger_enroll::{DerivationPath, LedgerSolana, TransportType};

fn main() {
    #[cfg(feature = "hid")]
    {
        let ledger = LedgerSolana::new(&TransportType::NativeHID).unwrap_or_else(|e| {
            eprintln!("failed to connect: {e}");
            std::process::exit(1);
        });

        for account in 0..5 {
            let path = DerivationPath::solana(account, None);
            match ledger.get_pubkey(&path) {
                Ok(pubkey) => println!("[{path}] {pubkey}"),
                Err(e) => eprintln!("[{path}] error: {e}"),
            }
        }
    }
    #[cfg(not(feature = "hid"))]
    {
        eprintln!("enable the 'hid' feature to use USB transport");
    }
}
