//! Security.framework backend.
//!
//! Every matcher targets generic-password items. Attributes the caller left
//! unset are not added to the dictionary, so the keychain applies its own
//! defaults (notably: no `kSecAttrSynchronizable` matches only local items).

use std::ptr;

use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};
use security_framework_sys::item::{
    kSecAttrAccount, kSecAttrService, kSecClass, kSecClassGenericPassword, kSecMatchLimit,
    kSecMatchLimitAll, kSecReturnAttributes, kSecReturnData, kSecValueData,
};
use security_framework_sys::keychain_item::{
    SecItemAdd, SecItemCopyMatching, SecItemDelete, SecItemUpdate,
};

use crate::accessibility::Accessibility;
use crate::query::{ItemAttributes, ItemChanges, ItemQuery, MatchLimit};

use super::status::BackendStatus;
use super::traits::{CredentialBackend, FindAllReply, FindReply, FoundItem};

// Declared locally: `security-framework-sys` does not export all of these on
// every release or platform.
#[link(name = "Security", kind = "framework")]
extern "C" {
    static kSecAttrAccessGroup: CFStringRef;
    static kSecAttrSynchronizable: CFStringRef;
    static kSecAttrAccessible: CFStringRef;
    static kSecAttrAccessibleWhenPasscodeSetThisDeviceOnly: CFStringRef;
    static kSecAttrAccessibleWhenUnlocked: CFStringRef;
    static kSecAttrAccessibleWhenUnlockedThisDeviceOnly: CFStringRef;
    static kSecAttrAccessibleAfterFirstUnlock: CFStringRef;
    static kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly: CFStringRef;
    static kSecUseDataProtectionKeychain: CFStringRef;
    static kSecMatchLimitOne: CFStringRef;
}

/// Wraps a framework constant without taking ownership of it.
fn constant(raw: CFStringRef) -> CFString {
    // SAFETY: framework constants are valid, immortal CFStrings.
    unsafe { CFString::wrap_under_get_rule(raw) }
}

fn accessible_value(accessibility: Accessibility) -> CFString {
    // SAFETY: reading linked framework statics.
    let raw = unsafe {
        match accessibility {
            Accessibility::PasscodeSetThisDeviceOnly => {
                kSecAttrAccessibleWhenPasscodeSetThisDeviceOnly
            }
            Accessibility::WhenUnlocked => kSecAttrAccessibleWhenUnlocked,
            Accessibility::WhenUnlockedThisDeviceOnly => {
                kSecAttrAccessibleWhenUnlockedThisDeviceOnly
            }
            Accessibility::AfterFirstUnlock => kSecAttrAccessibleAfterFirstUnlock,
            Accessibility::AfterFirstUnlockThisDeviceOnly => {
                kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly
            }
        }
    };
    constant(raw)
}

/// Ordered key/value pairs turned into a `CFDictionary` at the call site.
#[derive(Default)]
struct Attributes(Vec<(CFString, CFType)>);

impl Attributes {
    fn generic_password() -> Self {
        let mut attributes = Self::default();
        // SAFETY: reading linked framework statics.
        unsafe {
            attributes.push(kSecClass, constant(kSecClassGenericPassword).as_CFType());
        }
        attributes
    }

    fn push(&mut self, key: CFStringRef, value: CFType) {
        self.0.push((constant(key), value));
    }

    fn string(&mut self, key: CFStringRef, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, CFString::new(value).as_CFType());
        }
    }

    fn flag(&mut self, key: CFStringRef, value: Option<bool>) {
        if let Some(value) = value {
            let value = if value {
                CFBoolean::true_value()
            } else {
                CFBoolean::false_value()
            };
            self.push(key, value.as_CFType());
        }
    }

    fn accessibility(&mut self, accessibility: Option<Accessibility>) {
        if let Some(accessibility) = accessibility {
            // SAFETY: reading a linked framework static.
            let key = unsafe { kSecAttrAccessible };
            self.push(key, accessible_value(accessibility).as_CFType());
        }
    }

    fn data(&mut self, key: CFStringRef, value: &[u8]) {
        self.push(key, CFData::from_buffer(value).as_CFType());
    }

    fn into_dictionary(self) -> CFDictionary<CFString, CFType> {
        CFDictionary::from_CFType_pairs(&self.0)
    }
}

/// Matcher without any result shaping, as accepted by update and delete.
fn matcher(query: &ItemQuery) -> Attributes {
    let mut attributes = Attributes::generic_password();
    // SAFETY: reading linked framework statics.
    unsafe {
        attributes.string(kSecAttrAccount, query.account.as_deref());
        attributes.string(kSecAttrService, query.service.as_deref());
        attributes.string(kSecAttrAccessGroup, query.access_group.as_deref());
        attributes.flag(kSecAttrSynchronizable, query.synchronizable);
        if query.use_data_protection_keychain {
            attributes.flag(kSecUseDataProtectionKeychain, Some(true));
        }
    }
    attributes.accessibility(query.accessibility);
    attributes
}

fn search(query: &ItemQuery) -> CFDictionary<CFString, CFType> {
    let mut attributes = matcher(query);
    // SAFETY: reading linked framework statics.
    unsafe {
        attributes.flag(kSecReturnData, Some(query.return_data));
        attributes.flag(kSecReturnAttributes, Some(query.return_attributes));
        let limit = match query.match_limit {
            MatchLimit::One => kSecMatchLimitOne,
            MatchLimit::All => kSecMatchLimitAll,
        };
        attributes.push(kSecMatchLimit, constant(limit).as_CFType());
    }
    attributes.into_dictionary()
}

fn found_item(value: &CFType) -> Option<FoundItem> {
    if let Some(data) = value.downcast::<CFData>() {
        return Some(FoundItem {
            account: None,
            value: Some(data.bytes().to_vec()),
        });
    }
    if value.type_of() != CFDictionary::<CFString, CFType>::type_id() {
        return None;
    }
    // SAFETY: the type id was checked above; the get rule retains the value.
    let dictionary = unsafe {
        CFDictionary::<CFString, CFType>::wrap_under_get_rule(
            value.as_CFTypeRef() as CFDictionaryRef
        )
    };
    // SAFETY: reading linked framework statics.
    let (account_key, value_key) = unsafe { (kSecAttrAccount, kSecValueData) };
    Some(FoundItem {
        account: dictionary
            .find(account_key)
            .and_then(|account| account.downcast::<CFString>())
            .map(|account| account.to_string()),
        value: dictionary
            .find(value_key)
            .and_then(|data| data.downcast::<CFData>())
            .map(|data| data.bytes().to_vec()),
    })
}

fn found_items(value: &CFType) -> Vec<FoundItem> {
    if value.type_of() != CFArray::<CFType>::type_id() {
        return found_item(value).into_iter().collect();
    }
    // SAFETY: the type id was checked above; the get rule retains the value.
    let array =
        unsafe { CFArray::<CFType>::wrap_under_get_rule(value.as_CFTypeRef() as CFArrayRef) };
    array.iter().filter_map(|entry| found_item(&entry)).collect()
}

/// Runs `SecItemCopyMatching` and returns the decoded status plus the owned
/// result, if any.
fn copy_matching(query: &ItemQuery) -> (BackendStatus, Option<CFType>) {
    let dictionary = search(query);
    let mut result: CFTypeRef = ptr::null();
    // SAFETY: `dictionary` outlives the call and `result` is a valid out slot.
    let code = unsafe { SecItemCopyMatching(dictionary.as_concrete_TypeRef(), &mut result) };
    let value = (!result.is_null())
        // SAFETY: a non-null result is returned at +1 and owned by the caller.
        .then(|| unsafe { CFType::wrap_under_create_rule(result) });
    (BackendStatus::from_code(code), value)
}

/// Credential backend over the Apple keychain.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainBackend;

impl KeychainBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CredentialBackend for KeychainBackend {
    fn find(&self, query: ItemQuery) -> FindReply {
        match copy_matching(&query) {
            (BackendStatus::Success, value) => FindReply::found(
                value
                    .as_ref()
                    .and_then(|value| found_items(value).into_iter().next())
                    .unwrap_or_default(),
            ),
            (status, _) => FindReply::status(status),
        }
    }

    fn find_all(&self, query: ItemQuery) -> FindAllReply {
        match copy_matching(&query) {
            (BackendStatus::Success, value) => {
                FindAllReply::found(value.as_ref().map(found_items).unwrap_or_default())
            }
            (status, _) => FindAllReply::status(status),
        }
    }

    fn insert(&self, attributes: ItemAttributes) -> BackendStatus {
        let mut dictionary = Attributes::generic_password();
        // SAFETY: reading linked framework statics.
        unsafe {
            dictionary.string(kSecAttrAccount, Some(&attributes.account));
            dictionary.string(kSecAttrService, attributes.service.as_deref());
            dictionary.string(kSecAttrAccessGroup, attributes.access_group.as_deref());
            dictionary.flag(kSecAttrSynchronizable, attributes.synchronizable);
            if attributes.use_data_protection_keychain {
                dictionary.flag(kSecUseDataProtectionKeychain, Some(true));
            }
            dictionary.data(kSecValueData, &attributes.value);
        }
        dictionary.accessibility(attributes.accessibility);
        let dictionary = dictionary.into_dictionary();
        // SAFETY: `dictionary` outlives the call; no result is requested.
        let code = unsafe { SecItemAdd(dictionary.as_concrete_TypeRef(), ptr::null_mut()) };
        BackendStatus::from_code(code)
    }

    fn update(&self, mut query: ItemQuery, changes: ItemChanges) -> BackendStatus {
        query.use_data_protection_keychain |= changes.use_data_protection_keychain;
        let matcher = matcher(&query).into_dictionary();

        let mut update = Attributes::default();
        // SAFETY: reading linked framework statics.
        unsafe {
            update.data(kSecValueData, &changes.value);
            update.flag(kSecAttrSynchronizable, changes.synchronizable);
        }
        update.accessibility(changes.accessibility);
        let update = update.into_dictionary();

        // SAFETY: both dictionaries outlive the call.
        let code = unsafe {
            SecItemUpdate(matcher.as_concrete_TypeRef(), update.as_concrete_TypeRef())
        };
        BackendStatus::from_code(code)
    }

    fn delete(&self, query: ItemQuery) -> BackendStatus {
        let matcher = matcher(&query).into_dictionary();
        // SAFETY: `matcher` outlives the call.
        let code = unsafe { SecItemDelete(matcher.as_concrete_TypeRef()) };
        BackendStatus::from_code(code)
    }
}
