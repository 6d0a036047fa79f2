//! HD44780-compatible character LCD behind a PCF8574 I2C backpack.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use thiserror::Error;

pub const DEFAULT_ADDRESS: u8 = 0x27;

// PCF8574 pin mapping: P0=RS, P1=RW, P2=E, P3=Backlight, P4-P7=Data
const LCD_BACKLIGHT: u8 = 0x08;
const LCD_ENABLE: u8 = 0x04;
const LCD_RS: u8 = 0x01;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_SET: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

const SCAN_FIRST: u8 = 0x08;
const SCAN_LAST: u8 = 0x77;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("i2c write to {address:#04x} failed: {kind:?}")]
    Bus { address: u8, kind: ErrorKind },
    #[error("cursor row {0} out of range")]
    Row(u8),
}

/// Operations the screen renderer needs from a character display.
pub trait CharDisplay {
    fn clear(&mut self) -> Result<(), DisplayError>;
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), DisplayError>;
    fn write_str(&mut self, text: &str) -> Result<(), DisplayError>;
}

/// Probe every 7-bit address with an empty write and return the ones that
/// acknowledge.
pub fn scan<I: I2c>(i2c: &mut I) -> Vec<u8> {
    (SCAN_FIRST..=SCAN_LAST)
        .filter(|&address| i2c.write(address, &[]).is_ok())
        .collect()
}

/// Maps a character to the display's ROM. Accented Latin letters lose
/// their accent, anything else outside ASCII becomes `?`, so one char is
/// always one byte on the wire.
pub fn to_rom_byte(ch: char) -> u8 {
    if ch.is_ascii() && !ch.is_ascii_control() {
        return ch as u8;
    }
    let base = match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ą' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ą' => 'A',
        'č' | 'ć' | 'ç' => 'c',
        'Č' | 'Ć' | 'Ç' => 'C',
        'ď' => 'd',
        'Ď' => 'D',
        'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ę' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' | 'Ě' | 'Ę' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ľ' | 'ĺ' | 'ł' => 'l',
        'Ľ' | 'Ĺ' | 'Ł' => 'L',
        'ň' | 'ń' | 'ñ' => 'n',
        'Ň' | 'Ń' | 'Ñ' => 'N',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ő' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ő' => 'O',
        'ř' | 'ŕ' => 'r',
        'Ř' | 'Ŕ' => 'R',
        'š' | 'ś' | 'ß' => 's',
        'Š' | 'Ś' => 'S',
        'ť' => 't',
        'Ť' => 'T',
        'ú' | 'ù' | 'û' | 'ü' | 'ů' | 'ű' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ů' | 'Ű' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        'ž' | 'ź' | 'ż' => 'z',
        'Ž' | 'Ź' | 'Ż' => 'Z',
        _ => '?',
    };
    base as u8
}

pub struct Hd44780<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Hd44780<I, D> {
    /// Takes ownership of the bus and runs the 4-bit init sequence.
    pub fn new(i2c: I, delay: D, address: u8) -> Result<Self, DisplayError> {
        let mut lcd = Self {
            i2c,
            delay,
            address,
        };
        lcd.init()?;
        Ok(lcd)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.delay.delay_ms(50);

        self.write_nibble(0x03, false)?;
        self.delay.delay_ms(5);
        self.write_nibble(0x03, false)?;
        self.delay.delay_us(150);
        self.write_nibble(0x03, false)?;
        self.write_nibble(0x02, false)?;

        self.command(CMD_FUNCTION_SET)?;
        self.command(CMD_DISPLAY_ON)?;
        self.clear()?;
        self.command(CMD_ENTRY_MODE)
    }

    fn send(&mut self, byte: u8) -> Result<(), DisplayError> {
        let address = self.address;
        self.i2c
            .write(address, &[byte])
            .map_err(|err| DisplayError::Bus {
                address,
                kind: err.kind(),
            })
    }

    fn write_nibble(&mut self, nibble: u8, rs: bool) -> Result<(), DisplayError> {
        let rs_bit = if rs { LCD_RS } else { 0 };
        let data = (nibble << 4) | LCD_BACKLIGHT | rs_bit;

        self.send(data | LCD_ENABLE)?;
        self.delay.delay_us(1);
        self.send(data)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8, rs: bool) -> Result<(), DisplayError> {
        self.write_nibble((byte >> 4) & 0x0F, rs)?;
        self.write_nibble(byte & 0x0F, rs)
    }

    fn command(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.write_byte(cmd, false)
    }
}

impl<I: I2c, D: DelayNs> CharDisplay for Hd44780<I, D> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), DisplayError> {
        let offset = ROW_OFFSETS
            .get(usize::from(row))
            .ok_or(DisplayError::Row(row))?;
        self.command(CMD_SET_DDRAM | offset.wrapping_add(col))
    }

    fn write_str(&mut self, text: &str) -> Result<(), DisplayError> {
        for ch in text.chars() {
            self.write_byte(to_rom_byte(ch), true)?;
        }
        Ok(())
    }
}
