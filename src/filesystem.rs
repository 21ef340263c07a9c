use std::path::PathBuf;

#[cfg(target_os = "android")]
fn android_dir(getter: &str) -> Option<PathBuf> {
    use jni::{objects::{JObject, JString}, JavaVM};
    unsafe {
        let ctx = ndk_context::android_context();
        let vm = JavaVM::from_raw(ctx.vm().cast()).ok()?;
        let mut env = vm.attach_current_thread().ok()?;
        let context = JObject::from_raw(ctx.context().cast());
        let dir = env
            .call_method(context, getter, "()Ljava/io/File;", &[])
            .ok()?
            .l()
            .ok()?;
        let abs_path_obj = env
            .call_method(dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .ok()?
            .l()
            .ok()?;
        let abs_path: String = env.get_string(&JString::from(abs_path_obj)).ok()?.into();
        Some(PathBuf::from(abs_path))
    }
}

/// App-private files directory (`Context.getFilesDir()` on Android)
pub fn get_app_data_dir(package_name: &str) -> PathBuf {
    #[cfg(target_os = "android")]
    {
        if let Some(dir) = android_dir("getFilesDir") {
            return dir;
        }
        for d in [
            format!("/data/user/0/{}/files", package_name),
            format!("/data/data/{}/files", package_name),
        ] {
            let p = PathBuf::from(d);
            if p.exists() {
                return p;
            }
        }
        PathBuf::from("./data")
    }

    #[cfg(not(target_os = "android"))]
    {
        desktop_dir(package_name, "files")
    }
}

/// Staging area for converted stickers waiting to be assembled into a pack
pub fn get_app_cache_dir(package_name: &str) -> PathBuf {
    #[cfg(target_os = "android")]
    {
        android_dir("getCacheDir").unwrap_or_else(|| get_app_data_dir(package_name).join("cache"))
    }

    #[cfg(not(target_os = "android"))]
    {
        desktop_dir(package_name, "cache")
    }
}

#[cfg(not(target_os = "android"))]
fn desktop_dir(package_name: &str, leaf: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local/share")
            .join(package_name)
            .join(leaf),
        None => PathBuf::from("./data").join(leaf),
    }
}
