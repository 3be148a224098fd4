// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, no reflection, no final xor)

const POLY: u16 = 0x1021;
const INIT: u16 = 0xFFFF;

pub fn crc16_ccitt_false(bytes: &[u8]) -> u16 {
    let mut crc: u16 = INIT;
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        // 標準チェック値 "123456789" → 0x29B1
        assert_eq!(crc16_ccitt_false(b"123456789"), 0x29B1);
    }

    #[test]
    fn empty_input_is_seed() {
        assert_eq!(crc16_ccitt_false(&[]), 0xFFFF);
    }
}
