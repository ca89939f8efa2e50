// pahe-dl - AnimePahe stream resolver and downloader
// Copyright (C) 2025 pahe-dl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Stream resolution: play page → candidate selection → intermediate page →
//! media locator, with packed-code reversal as the fallback.

pub mod resolver;
pub mod unpack;

pub use resolver::{resolve, ResolutionRequest, StreamCandidate, StreamLocator};
pub use unpack::{deobfuscate, ObfuscatedPayload};
