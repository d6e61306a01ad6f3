//! InputBox contract bindings.

use alloy::sol;

sol! {
    /// Emitted by the InputBox contract for every input added to an
    /// application. The application address and the input index are
    /// indexed, so the watcher can filter server-side.
    #[derive(Debug)]
    event InputAdded(
        address indexed app,
        uint256 indexed index,
        address sender,
        bytes input
    );
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, Bytes, LogData, B256, U256};
    use alloy::sol_types::{SolEvent, SolValue};

    use super::*;

    #[test]
    fn test_decode_input_added_log() {
        let app = Address::repeat_byte(0x70);
        let sender = Address::repeat_byte(0x11);
        let input = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]);

        let topics = vec![
            InputAdded::SIGNATURE_HASH,
            app.into_word(),
            B256::from(U256::from(3u64)),
        ];
        let data = (sender, input.clone()).abi_encode_params();
        let log = LogData::new_unchecked(topics, data.into());

        let event = InputAdded::decode_log_data(&log, true).expect("valid log");
        assert_eq!(event.app, app);
        assert_eq!(event.index, U256::from(3u64));
        assert_eq!(event.sender, sender);
        assert_eq!(event.input, input);
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            InputAdded::SIGNATURE,
            "InputAdded(address,uint256,address,bytes)"
        );
    }
}
